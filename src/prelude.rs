pub use crate::app::App;
pub use crate::config::{Defaults, ServerConfig};
pub use crate::content::{Capabilities, OutputHandler, OutputRegistry, SerializationError, Shape};
pub use crate::endpoint::{Endpoint, ParamRule, Route};
pub use crate::request::{Header, Method, Params, Request};
pub use crate::response::{Body, Response};
pub use crate::server::Server;
