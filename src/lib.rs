//! A minimal HTTP API server framework. This is a learning project, use at your own risk.
//! * Single-threaded [TCP server](crate::server::tcp::TcpServer) with its own HTTP/1.x [framing](crate::request::parser)
//! * Versioned [endpoints](crate::endpoint::Endpoint) registered on an [app](crate::app::App)
//! * Method and path based [request routing](crate::router::Router) with `:name` and `*` segments
//! * Parameter [validation](crate::dispatch::validate) with regex constraints and custom validators
//! * Pluggable, capability-tagged [output handlers](crate::content::OutputHandler), selected by content negotiation
//!
//! # Example
//! ```
//! use jbapi::io::ChunkedStream;
//! use jbapi::prelude::*;
//! use jbapi::server::StreamServer;
//!
//! fn people() -> Endpoint {
//!     Endpoint::new()
//!         .get(
//!             Route::new("/people/:name", "greet")
//!                 .param("name", ParamRule::required().constraint("^[A-Za-z]+$")),
//!         )
//!         .get(Route::new("/people", "list"))
//!         .handler("greet", |params, response| {
//!             let name = params.get("name").unwrap_or("stranger");
//!             response.set(format!("Hello, {}!", name), 200)
//!         })
//!         .handler("list", |_, response| {
//!             response.set(serde_json::json!({"people": ["Bob", "Alice"]}), 200)
//!         })
//! }
//!
//! fn main() {
//!     let app = App::new().with_endpoint("people", "v1", people);
//!
//!     let request = b"GET /v1/people/Bob?format=plain HTTP/1.0\r\nAccept: */*\r\n\r\n";
//!     println!("Request:\n{}", std::str::from_utf8(request).unwrap());
//!     let stream = ChunkedStream::new(request, 16);
//!     let mut server = StreamServer::new(stream, &app, ServerConfig::default());
//!     server.serve_one().unwrap();
//!     let output = String::from_utf8(server.into_stream().into_output()).unwrap();
//!     println!("Response:\n{}", output);
//!     assert!(output.ends_with("Hello, Bob!"));
//! }
//! ```
pub mod app;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod endpoint;
pub mod io;
pub mod prelude;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub use crate::app::App;
pub use crate::config::{Defaults, ServerConfig};
pub use crate::content::{Capabilities, OutputHandler, OutputRegistry, SerializationError, Shape};
pub use crate::endpoint::{Endpoint, ParamRule, Route};
pub use crate::request::{Method, Params, Request};
pub use crate::response::{Body, Encoded, Response};
pub use crate::server::Server;
