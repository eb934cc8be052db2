//! Output handlers: stateless, capability-tagged encoders selected by name
//! during content negotiation.
//!
//! Add new output formats by implementing [`OutputHandler`] and registering
//! the handler on an [`OutputRegistry`].
//!
//! # Example
//! ```
//! use jbapi::content::{Capabilities, OutputHandler, OutputRegistry, SerializationError, Shape};
//!
//! struct Shout;
//!
//! impl OutputHandler for Shout {
//!     fn media_type(&self) -> &'static str {
//!         "text/plain"
//!     }
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::SCALAR
//!     }
//!     fn encode_scalar(&self, data: &str) -> Result<Vec<u8>, SerializationError> {
//!         Ok(data.to_uppercase().into_bytes())
//!     }
//! }
//!
//! let registry = OutputRegistry::new().with_handler("shout", Shout);
//! let shout = registry.select("SHOUT", Shape::Scalar).unwrap();
//! assert_eq!(shout.encode_scalar("hi").unwrap(), b"HI".to_vec());
//! assert!(registry.select("shout", Shape::Structured).is_err());
//! ```
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub mod json;
pub mod plain;

pub use json::Json;
pub use plain::Plain;

/// The two body shapes an output handler may be able to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Structured,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_encode_scalar: bool,
    pub can_encode_structured: bool,
}

impl Capabilities {
    pub const SCALAR: Self = Self {
        can_encode_scalar: true,
        can_encode_structured: false,
    };
    pub const STRUCTURED: Self = Self {
        can_encode_scalar: false,
        can_encode_structured: true,
    };
    pub const BOTH: Self = Self {
        can_encode_scalar: true,
        can_encode_structured: true,
    };

    pub fn supports(&self, shape: Shape) -> bool {
        match shape {
            Shape::Scalar => self.can_encode_scalar,
            Shape::Structured => self.can_encode_structured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("serialization error: {reason}")]
pub struct SerializationError {
    reason: String,
}

impl SerializationError {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(&err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("No output handler named \"{0}\"")]
    NotFound(String),
    #[error("Output handler \"{name}\" cannot encode {shape} data")]
    Unsupported { name: String, shape: Shape },
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// A stateless encoder from response bodies to output bytes.
///
/// Implementations advertise what they can encode through
/// [`capabilities`](OutputHandler::capabilities); the encode method for an
/// unsupported shape is never called by the response pipeline.
pub trait OutputHandler: Send + Sync {
    fn media_type(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    fn encode_scalar(&self, _data: &str) -> Result<Vec<u8>, SerializationError> {
        Err(SerializationError::new("scalar data is not supported"))
    }
    fn encode_structured(&self, _data: &Value) -> Result<Vec<u8>, SerializationError> {
        Err(SerializationError::new("structured data is not supported"))
    }
    /// Headers contributed to every response this handler encodes.
    fn headers(&self) -> Vec<String> {
        vec![format!("Content-Type: {}", self.media_type())]
    }
}

/// Output handlers by (case-insensitive) name. Always holds a plain text
/// fallback, even if `plain` is replaced or never looked up by name.
pub struct OutputRegistry {
    handlers: HashMap<String, Box<dyn OutputHandler>>,
    fallback: Plain,
}

impl OutputRegistry {
    /// A registry with the reference `plain` and `json` handlers.
    pub fn new() -> Self {
        Self::empty().with_handler("plain", Plain).with_handler("json", Json)
    }
    /// A registry with no named handlers, only the fallback.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Plain,
        }
    }
    pub fn register<H>(&mut self, name: &str, handler: H)
    where
        H: 'static + OutputHandler,
    {
        self.handlers
            .insert(name.to_ascii_lowercase(), Box::new(handler));
    }
    pub fn with_handler<H>(mut self, name: &str, handler: H) -> Self
    where
        H: 'static + OutputHandler,
    {
        self.register(name, handler);
        self
    }
    pub fn get(&self, name: &str) -> Option<&dyn OutputHandler> {
        self.handlers
            .get(&name.to_ascii_lowercase())
            .map(|h| h.as_ref())
    }
    pub fn fallback(&self) -> &dyn OutputHandler {
        &self.fallback
    }
    /// Find the handler named `name` and check it can encode `shape`.
    pub fn select(&self, name: &str, shape: Shape) -> Result<&dyn OutputHandler, Error> {
        let handler = self
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if handler.capabilities().supports(shape) {
            Ok(handler)
        } else {
            Err(Error::Unsupported {
                name: name.to_string(),
                shape,
            })
        }
    }
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for OutputRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = OutputRegistry::new();
        assert_eq!(registry.names(), vec!["json", "plain"]);
        assert!(registry.select("json", Shape::Structured).is_ok());
        assert!(registry.select("Plain", Shape::Scalar).is_ok());
    }

    #[test]
    fn test_select_errors() {
        let registry = OutputRegistry::new();
        assert_eq!(
            registry.select("xml", Shape::Scalar).err(),
            Some(Error::NotFound("xml".to_string()))
        );
        let err = registry.select("plain", Shape::Structured).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Output handler \"plain\" cannot encode structured data"
        );
    }

    #[test]
    fn test_fallback_always_present() {
        let registry = OutputRegistry::empty();
        assert!(registry.get("plain").is_none());
        assert!(registry.fallback().capabilities().can_encode_scalar);
    }
}
