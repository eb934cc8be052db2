//! HTTP request, parameters and message framing.
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

pub use header::*;

pub mod header;
pub mod parser;

/// An HTTP request, created once per connection by the
/// [framer](crate::request::parser::parse).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub protocol: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    /// Query and body parameters, body wins on collision.
    pub params: Params,
    /// Peer address, only known when the request came in over a socket.
    pub remote_addr: Option<SocketAddr>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query: "".to_string(),
            protocol: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            body: vec![],
            params: Params::new(),
            remote_addr: None,
        }
    }
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            ..Self::default()
        }
    }
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name, value);
        self
    }
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_string();
        self
    }
    /// Non-empty path segments, in order.
    pub fn segments(&self) -> Vec<&str> {
        segments(&self.path)
    }
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    PATCH,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMethod(pub String);

impl fmt::Display for InvalidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid HTTP method '{}'", self.0)
    }
}

impl FromStr for Method {
    type Err = InvalidMethod;
    fn from_str(s: &str) -> Result<Method, InvalidMethod> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            "CONNECT" => Ok(Method::CONNECT),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            other => Err(InvalidMethod(other.to_string())),
        }
    }
}

/// A flat name -> value parameter mapping. Inserting an existing name
/// replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Params(HashMap::new())
    }
    /// Parse `a=1&b=two+words&c=%2F` style data. Pairs without `=` get an
    /// empty value, later duplicates win.
    pub fn from_urlencoded(s: &str) -> Self {
        let mut params = Self::new();
        for pair in s.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = match pair.split_once('=') {
                Some((name, value)) => (name, value),
                None => (pair, ""),
            };
            let name = form_decode(name);
            if !name.is_empty() {
                params.insert(&name, &form_decode(value));
            }
        }
        params
    }
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_str())
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }
    /// Copy every entry of `other` over this mapping.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Params(iter.into_iter().collect())
    }
}

fn form_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_from_urlencoded() {
        let params = Params::from_urlencoded("name=John+Smith&path=%2Fhome&flag&name2=");
        assert_eq!(params.get("name"), Some("John Smith"));
        assert_eq!(params.get("path"), Some("/home"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get("name2"), Some(""));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_params_later_duplicate_wins() {
        let params = Params::from_urlencoded("a=1&a=2");
        assert_eq!(params.get("a"), Some("2"));
    }

    #[test]
    fn test_params_merge_overrides() {
        let mut params = Params::from_urlencoded("id=query&keep=yes");
        params.merge(Params::from_urlencoded("id=path"));
        assert_eq!(params.get("id"), Some("path"));
        assert_eq!(params.get("keep"), Some("yes"));
    }

    #[test]
    fn test_method_roundtrip_names() {
        for name in &["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
            assert_eq!(Method::from_str(name).unwrap().as_str(), *name);
        }
        assert_eq!(
            Method::from_str("FOO"),
            Err(InvalidMethod("FOO".to_string()))
        );
    }

    #[test]
    fn test_request_segments() {
        let request = Request::new(Method::GET, "/v1//my/route/");
        assert_eq!(request.segments(), vec!["v1", "my", "route"]);
        assert!(Request::default().segments().is_empty());
    }
}
