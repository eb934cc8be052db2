//! Plain text output.
use crate::content::{Capabilities, OutputHandler, SerializationError};

/// Writes scalar bodies as-is. Cannot encode structured data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl OutputHandler for Plain {
    fn media_type(&self) -> &'static str {
        "text/plain"
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::SCALAR
    }
    fn encode_scalar(&self, data: &str) -> Result<Vec<u8>, SerializationError> {
        Ok(data.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_output_string() {
        assert_eq!(
            Plain.encode_scalar("This is a plain string").unwrap(),
            b"This is a plain string".to_vec()
        );
    }

    #[test]
    fn test_plain_headers() {
        let headers: Vec<String> = Plain.headers().iter().map(|h| h.to_lowercase()).collect();
        assert!(headers.contains(&"content-type: text/plain".to_string()));
    }

    #[test]
    fn test_plain_refuses_structured() {
        assert!(!Plain.capabilities().can_encode_structured);
        assert!(Plain.encode_structured(&serde_json::json!({})).is_err());
    }
}
