//! HTTP Server components.
use std::io;
use std::net::SocketAddr;

use log::{debug, error};
use thiserror::Error;

pub mod stream;
pub mod tcp;

pub use stream::{serve_connection, StreamServer};
pub use tcp::TcpServer;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Creating, configuring, binding or listening on the server socket
    /// failed. Fatal at startup.
    #[error("failed to {action} socket on {addr}: {source}")]
    Socket {
        action: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The client sent more than the configured maximum before a full
    /// request could be framed.
    #[error("request exceeds {limit} bytes, connection aborted")]
    RequestTooLarge { limit: usize },
    #[error("connection closed before a request was received")]
    ConnectionClosed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub trait Server {
    /// Serve one request, must be implemented.
    fn serve_one(&mut self) -> Result<(), ServerError>;
    /// Serve requests forever (default implementation). Errors only end the
    /// connection they happened on.
    fn serve_forever(&mut self) {
        loop {
            match self.serve_one() {
                Ok(()) => (),
                Err(ServerError::ConnectionClosed) => debug!("{}", ServerError::ConnectionClosed),
                Err(e) => error!("{}", e),
            }
        }
    }
}
