//! TCP HTTP server.
use std::io;
use std::net::{SocketAddr, TcpListener};

use log::*;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::{
    app::App,
    config::ServerConfig,
    server::{serve_connection, Server, ServerError},
};

/// A single-threaded TCP server: one connection is accepted, read,
/// answered and closed before the next.
///
/// Waiting for a connection is bounded by the configured timeout; a
/// `serve_one` call that times out returns `Ok(())` so the caller can poll
/// again.
pub struct TcpServer {
    listener: TcpListener,
    app: App,
    config: ServerConfig,
}

fn socket_error(action: &'static str, addr: SocketAddr) -> impl FnOnce(io::Error) -> ServerError {
    move |source| ServerError::Socket {
        action,
        addr,
        source,
    }
}

impl TcpServer {
    /// Create, bind and listen on the socket described by `config`.
    ///
    /// # Arguments
    /// * `config`: bind address, port and tunables
    /// * `app`: the endpoints to serve
    pub fn bind(config: ServerConfig, app: App) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(socket_error("create", addr))?;
        socket
            .set_reuse_address(true)
            .map_err(socket_error("set SO_REUSEADDR on", addr))?;
        socket
            .bind(&SockAddr::from(addr))
            .map_err(socket_error("bind", addr))?;
        socket
            .listen(config.backlog)
            .map_err(socket_error("listen on", addr))?;
        let timeout = Some(config.timeout).filter(|t| !t.is_zero());
        socket
            .set_read_timeout(timeout)
            .map_err(socket_error("set accept timeout on", addr))?;
        let listener: TcpListener = socket.into();

        let server = Self {
            listener,
            app,
            config,
        };
        info!("listening on {}", server.local_addr()?);
        let endpoints = server.app.describe_endpoints();
        if endpoints.is_empty() {
            warn!("no endpoints registered");
        }
        for endpoint in endpoints {
            info!("found endpoint {}", endpoint);
        }
        Ok(server)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

impl Server for TcpServer {
    fn serve_one(&mut self) -> Result<(), ServerError> {
        let (mut stream, addr) = match self.listener.accept() {
            Ok(connection) => connection,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                trace!("no connection within {:?}", self.config.timeout);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        debug!("accepted connection from {}", addr);
        let timeout = Some(self.config.timeout).filter(|t| !t.is_zero());
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        let result = serve_connection(&mut stream, &self.app, &self.config, Some(addr));
        debug!("closing connection from {}", addr);
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::endpoint::{Endpoint, Route};
    use std::io::prelude::*;
    use std::net::{IpAddr, TcpStream};
    use std::time::Duration;

    fn config(port: u16) -> ServerConfig {
        ServerConfig::new(IpAddr::from([127, 0, 0, 1]), port).with_timeout(Duration::from_millis(200))
    }

    fn app() -> App {
        App::new().with_endpoint("my", "v1", || {
            Endpoint::new()
                .get(Route::new("/my/route", "myfunction"))
                .handler("myfunction", |_, response| {
                    response.set("This is the response", 200)
                })
        })
    }

    #[test]
    fn test_serve_one_over_tcp() {
        let mut server = TcpServer::bind(config(0), app()).unwrap();
        let addr = server.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /v1/my/route?format=plain HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        server.serve_one().unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).unwrap();
        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.contains("\r\nConnection: close\r\n"));
        assert!(output.ends_with("\r\n\r\nThis is the response"));
    }

    #[test]
    fn test_accept_times_out() {
        let mut server = TcpServer::bind(config(0), app()).unwrap();
        assert!(server.serve_one().is_ok());
    }

    #[test]
    fn test_bind_in_use_fails() {
        let server = TcpServer::bind(config(0), app()).unwrap();
        let port = server.local_addr().unwrap().port();
        match TcpServer::bind(config(port), app()) {
            Err(ServerError::Socket { action, .. }) => assert_eq!(action, "bind"),
            other => panic!("expected bind failure, got {:?}", other.err()),
        }
    }
}
