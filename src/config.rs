//! Process-wide negotiation defaults and listener settings.
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Defaults used by every endpoint unless a route overrides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Output handler used when nothing else is requested.
    pub output_handler: String,
    /// Request parameter that selects an output handler.
    pub output_handler_param: String,
    /// Wrap bodies in an endpoint/version/status envelope when the output
    /// handler can encode structured data.
    pub response_detail: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output_handler: "json".to_string(),
            output_handler_param: "format".to_string(),
            response_detail: false,
        }
    }
}

impl Defaults {
    pub fn with_output_handler(mut self, name: &str) -> Self {
        self.output_handler = name.to_string();
        self
    }
    pub fn with_output_handler_param(mut self, name: &str) -> Self {
        self.output_handler_param = name.to_string();
        self
    }
    pub fn with_response_detail(mut self, enabled: bool) -> Self {
        self.response_detail = enabled;
        self
    }
}

/// TCP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Bounds each wait for a connection and each read from a client.
    pub timeout: Duration,
    pub backlog: i32,
    /// Bytes requested per read call.
    pub read_buffer_size: usize,
    /// Largest request accepted; a connection that sends more is dropped.
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            timeout: Duration::from_secs(3),
            backlog: 64,
            read_buffer_size: 4096,
            max_request_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: IpAddr, port: u16) -> Self {
        Self {
            bind_addr,
            port,
            ..Self::default()
        }
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self
    }
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.backlog, 64);
        assert_eq!(config.read_buffer_size, 4096);
    }

    #[test]
    fn test_negotiation_defaults() {
        let defaults = Defaults::default();
        assert_eq!(defaults.output_handler, "json");
        assert_eq!(defaults.output_handler_param, "format");
        assert!(!defaults.response_detail);
    }

    #[test]
    fn test_read_buffer_never_zero() {
        assert_eq!(ServerConfig::default().with_read_buffer_size(0).read_buffer_size, 1);
    }
}
