//! Per-connection framing loop, usable over any byte stream.
use std::io::{self, prelude::*};
use std::net::SocketAddr;
use std::time::Instant;

use log::*;

use crate::{
    app::App,
    config::ServerConfig,
    request::parser::{self, Framing},
    response::status,
    server::{Server, ServerError},
};

/// Body of the 400 sent when the client stops sending mid-request.
const INCOMPLETE_REQUEST: &str = "Incomplete request";

fn is_favicon(path: &str) -> bool {
    path.trim_start_matches('/') == "favicon.ico"
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Read one request from `stream`, dispatch it through `app` and write the
/// response.
///
/// Reads `config.read_buffer_size` bytes at a time until the framer reports
/// a complete message. Malformed or truncated requests are answered with a
/// 400, and a read timeout after part of a request with a 408. Going past `config.max_request_size` aborts the connection without
/// a response, and so does a request for `favicon.ico`.
pub fn serve_connection<S>(
    stream: &mut S,
    app: &App,
    config: &ServerConfig,
    peer: Option<SocketAddr>,
) -> Result<(), ServerError>
where
    S: Read + Write,
{
    let start = Instant::now();
    let mut input: Vec<u8> = vec![];
    let mut buf = vec![0; config.read_buffer_size.max(1)];
    let framed = loop {
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) && !input.is_empty() => {
                break Err((status::default(408), 408));
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            if input.is_empty() {
                return Err(ServerError::ConnectionClosed);
            }
            break Err((INCOMPLETE_REQUEST.to_string(), 400));
        }
        input.extend_from_slice(&buf[..n]);
        if input.len() > config.max_request_size {
            return Err(ServerError::RequestTooLarge {
                limit: config.max_request_size,
            });
        }
        match parser::parse(&input) {
            Ok(Framing::Incomplete) => trace!("incomplete request after {} bytes", input.len()),
            Ok(Framing::Complete(request)) => break Ok(request),
            Err(e) => break Err((e.to_string(), 400)),
        }
    };

    let (encoded, method, path, content_length) = match framed {
        Ok(mut request) => {
            if is_favicon(&request.path) {
                debug!("ignoring {}", request.path);
                return Ok(());
            }
            request.remote_addr = peer;
            trace!("REQUEST {:?}", &request);
            let encoded = app.respond(&request);
            let method = request.method.to_string();
            (encoded, method, request.path, request.body.len())
        }
        Err((message, status)) => {
            warn!("{} after {} bytes", message, input.len());
            let encoded = app.reject(&message, status);
            (encoded, "<none>".to_string(), "<none>".to_string(), 0)
        }
    };
    trace!("RESPONSE {:?}", &encoded);

    let status = encoded.status;
    let body_length = encoded.body.len();
    stream.write_all(&encoded.into_bytes())?;
    stream.flush()?;
    info!(
        "{}ms - {} {} {} ({} bytes) -> {} ({} bytes)",
        start.elapsed().as_millis(),
        peer.map_or_else(|| "-".to_string(), |addr| addr.to_string()),
        method,
        path,
        content_length,
        status,
        body_length,
    );
    Ok(())
}

/// Serve one request per call over a generic stream.
///
/// # Example
/// ```
/// use jbapi::app::App;
/// use jbapi::config::ServerConfig;
/// use jbapi::endpoint::{Endpoint, Route};
/// use jbapi::io::ChunkedStream;
/// use jbapi::server::{Server, StreamServer};
///
/// let app = App::new().with_endpoint("hello", "v1", || {
///     Endpoint::new()
///         .get(Route::new("/hello", "hello"))
///         .handler("hello", |_, response| response.set("Hello!", 200))
/// });
///
/// let stream = ChunkedStream::new(b"GET /v1/hello.plain HTTP/1.1\r\nHost: localhost\r\n\r\n", 8);
/// let mut server = StreamServer::new(stream, &app, ServerConfig::default());
/// server.serve_one().unwrap();
///
/// let output = String::from_utf8(server.into_stream().into_output()).unwrap();
/// assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(output.ends_with("\r\n\r\nHello!"));
/// ```
pub struct StreamServer<'a, S> {
    stream: S,
    app: &'a App,
    config: ServerConfig,
}

impl<'a, S> StreamServer<'a, S> {
    pub fn new(stream: S, app: &'a App, config: ServerConfig) -> Self {
        Self {
            stream,
            app,
            config,
        }
    }
    pub fn into_stream(self) -> S {
        self.stream
    }
}

impl<'a, S> Server for StreamServer<'a, S>
where
    S: Read + Write,
{
    fn serve_one(&mut self) -> Result<(), ServerError> {
        serve_connection(&mut self.stream, self.app, &self.config, None)
    }
}
