//! HTTP response, content negotiation and wire output.
use log::{error, trace, warn};
use serde_json::{json, Map, Value};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::content::{self, OutputHandler, OutputRegistry, Shape};
use crate::request::Params;

pub mod status;

/// A response body, either a scalar string or structured data. The two are
/// encoded through different output handler capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Scalar(String),
    Structured(Value),
}

impl Body {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::Structured(_) => Shape::Structured,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Structured(_) => None,
        }
    }
    fn into_value(self) -> Value {
        match self {
            Self::Scalar(s) => Value::String(s),
            Self::Structured(v) => v,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Scalar(String::new())
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Scalar(s)
    }
}

/// JSON strings become scalar bodies, every other value is structured.
impl From<Value> for Body {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => Self::Scalar(s),
            other => Self::Structured(other),
        }
    }
}

impl From<Map<String, Value>> for Body {
    fn from(m: Map<String, Value>) -> Self {
        Self::Structured(Value::Object(m))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Detail {
    endpoint: String,
    version: String,
}

/// A response under construction.
///
/// The status defaults to 500 until a handler sets it. Headers are kept as
/// raw `Name: value` lines, and setting a header whose name token (text
/// before the `:`, or before the `/` of a status line) matches an existing
/// one replaces it in place.
///
/// # Example
/// ```
/// use jbapi::content::OutputRegistry;
/// use jbapi::response::Response;
///
/// let mut response = Response::new();
/// response.set("Hello!", 200);
/// response.set_output_handler("plain");
/// let encoded = response.send(&OutputRegistry::new(), Some("HTTP/1.1"));
///
/// assert_eq!(encoded.status, 200);
/// assert_eq!(
///     encoded.headers,
///     vec!["HTTP/1.1 200 OK", "Cache-Control: no-cache", "Content-Type: text/plain"]
/// );
/// assert_eq!(encoded.body, b"Hello!".to_vec());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    body: Body,
    headers: Vec<String>,
    output_handler: Option<String>,
    is_set: bool,
    detail: Option<Detail>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 500,
            body: Body::default(),
            headers: vec![],
            output_handler: None,
            is_set: false,
            detail: None,
        }
    }
    pub fn set<B: Into<Body>>(&mut self, body: B, status: u16) {
        self.set_body(body);
        self.set_status(status);
    }
    pub fn set_body<B: Into<Body>>(&mut self, body: B) {
        self.body = body.into();
        self.is_set = true;
    }
    /// Status codes are integers by type; a code missing from the status
    /// table is sent as 500.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
        self.is_set = true;
    }
    /// Add a raw header line, replacing any header with the same name token.
    pub fn set_header(&mut self, line: &str) {
        let token = name_token(line);
        match self
            .headers
            .iter()
            .position(|h| name_token(h).eq_ignore_ascii_case(token))
        {
            Some(i) => self.headers[i] = line.to_string(),
            None => self.headers.push(line.to_string()),
        }
    }
    pub fn status(&self) -> u16 {
        self.status
    }
    pub fn body(&self) -> &Body {
        &self.body
    }
    /// Header lines, status line first.
    pub fn headers(&self) -> Vec<&str> {
        let (status_lines, others): (Vec<&String>, Vec<&String>) =
            self.headers.iter().partition(|h| is_status_line(h));
        status_lines
            .into_iter()
            .chain(others)
            .map(|h| h.as_str())
            .collect()
    }
    pub fn is_set(&self) -> bool {
        self.is_set
    }
    pub fn output_handler(&self) -> Option<&str> {
        self.output_handler.as_deref()
    }
    pub fn set_output_handler(&mut self, name: &str) {
        self.output_handler = Some(name.to_ascii_lowercase());
    }
    /// Wrap the body in an endpoint/version/status envelope at send time,
    /// when the chosen output handler can encode structured data.
    pub fn set_detail(&mut self, endpoint: &str, version: &str) {
        self.detail = Some(Detail {
            endpoint: endpoint.to_string(),
            version: version.to_string(),
        });
    }
    /// Choose the output handler name: a transport-level `forced` name
    /// first, then the request parameter `param_name` (which is removed from
    /// `params`), then `default_name`.
    pub fn configure_handler(
        &mut self,
        forced: Option<&str>,
        param_name: &str,
        default_name: &str,
        params: &mut Params,
    ) {
        let requested = params.remove(param_name);
        let name = match (forced, requested) {
            (Some(forced), _) if !forced.is_empty() => forced.to_string(),
            (_, Some(requested)) if !requested.is_empty() => requested,
            _ => default_name.to_string(),
        };
        trace!("negotiated output handler '{}'", name);
        self.set_output_handler(&name);
    }

    fn wrap_detail(&mut self, outputs: &OutputRegistry) {
        let detail = match &self.detail {
            Some(detail) => detail.clone(),
            None => return,
        };
        let structured = self
            .output_handler
            .as_deref()
            .and_then(|name| outputs.get(name))
            .map_or(false, |h| h.capabilities().can_encode_structured);
        if structured {
            let body = std::mem::take(&mut self.body).into_value();
            self.body = Body::Structured(json!({
                "endpoint": detail.endpoint,
                "version": detail.version,
                "status": self.status,
                "response": body,
            }));
        }
    }

    fn select<'o>(
        &self,
        outputs: &'o OutputRegistry,
    ) -> Result<&'o dyn OutputHandler, content::Error> {
        match self.output_handler.as_deref() {
            Some(name) => outputs.select(name, self.body.shape()),
            None if outputs.fallback().capabilities().supports(self.body.shape()) => {
                Ok(outputs.fallback())
            }
            None => Err(content::Error::Unsupported {
                name: "plain".to_string(),
                shape: self.body.shape(),
            }),
        }
    }

    fn fall_back<'o>(
        &mut self,
        outputs: &'o OutputRegistry,
        message: String,
        status: u16,
    ) -> (&'o dyn OutputHandler, Vec<u8>) {
        self.set(message.as_str(), status);
        let handler = outputs.fallback();
        let body = handler.encode_scalar(&message).unwrap_or_default();
        (handler, body)
    }

    /// Encode the body with the negotiated output handler and finalize the
    /// headers.
    ///
    /// An unknown output handler, or one that cannot encode the body's
    /// shape, turns the response into a 415 encoded by the plain text
    /// fallback. `protocol` is the request's protocol; anything but
    /// HTTP/1.0 and HTTP/1.1 is answered with 505.
    pub fn send(&mut self, outputs: &OutputRegistry, protocol: Option<&str>) -> Encoded {
        self.set_header("Cache-Control: no-cache");
        self.wrap_detail(outputs);

        let (handler, body) = match self.select(outputs) {
            Ok(handler) => match encode(handler, &self.body) {
                Ok(body) => (handler, body),
                Err(e) => {
                    error!("output handler failed: {}", e);
                    self.fall_back(outputs, e.to_string(), 500)
                }
            },
            Err(e) => {
                warn!("{}", e);
                self.fall_back(outputs, e.to_string(), 415)
            }
        };
        for header in handler.headers() {
            self.set_header(&header);
        }

        let (status, status_line) = status::status_line(protocol, self.status);
        self.set_header(&status_line);
        Encoded {
            status,
            headers: self.headers().into_iter().map(String::from).collect(),
            body,
        }
    }
}

fn encode(handler: &dyn OutputHandler, body: &Body) -> Result<Vec<u8>, content::SerializationError> {
    match body {
        Body::Scalar(s) => handler.encode_scalar(s),
        Body::Structured(v) => handler.encode_structured(v),
    }
}

fn is_status_line(line: &str) -> bool {
    line.starts_with("HTTP/")
}

fn name_token(line: &str) -> &str {
    let delimiter = if is_status_line(line) { '/' } else { ':' };
    line.split_once(delimiter).map_or(line, |(name, _)| name).trim()
}

/// A fully encoded response: header lines (status line first) and body.
///
/// A host that frames HTTP itself sends `headers` and `body` as they are;
/// a raw socket uses [`into_bytes`](Encoded::into_bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub status: u16,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl Encoded {
    /// Raw HTTP response bytes, with `Date`, `Content-Length` and
    /// `Connection: close` added after the other headers.
    pub fn into_bytes(self) -> Vec<u8> {
        self.into_bytes_at(OffsetDateTime::now_utc())
    }

    fn into_bytes_at(self, now: OffsetDateTime) -> Vec<u8> {
        let mut bytes: Vec<u8> = vec![];
        for header in &self.headers {
            bytes.extend(format!("{}\r\n", header).into_bytes());
        }
        if let Some(date) = http_date(now) {
            bytes.extend(format!("Date: {}\r\n", date).into_bytes());
        }
        bytes.extend(format!("Content-Length: {}\r\n", self.body.len()).into_bytes());
        bytes.extend(b"Connection: close\r\n");
        bytes.extend(b"\r\n");
        bytes.extend(self.body);
        bytes
    }
}

fn http_date(now: OffsetDateTime) -> Option<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    now.to_offset(UtcOffset::UTC).format(&format).ok()
}
