//! JSON output with [`serde_json`](serde_json), pretty-printed with two
//! space indentation.
use serde_json::Value;

use crate::content::{Capabilities, OutputHandler, SerializationError};

/// Encodes structured bodies as JSON documents and scalar bodies as JSON
/// strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl OutputHandler for Json {
    fn media_type(&self) -> &'static str {
        "application/json"
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::BOTH
    }
    fn encode_scalar(&self, data: &str) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(data)?)
    }
    fn encode_structured(&self, data: &Value) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec_pretty(data)?)
    }
}
