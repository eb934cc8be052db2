//! Message framing: turns the bytes read so far from a connection into a
//! [`Request`](crate::request::Request) once a full HTTP/1.x message is there.
use std::str::FromStr;

use thiserror::Error;

use crate::request::{Headers, Method, Params, Request};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const LINE_TERMINATOR: &str = "\r\n";

/// Outcome of one framing attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Framing {
    /// Not a full message yet, read more.
    Incomplete,
    Complete(Request),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error parsing request at position {position}: {reason}")]
pub struct RequestParserError {
    position: usize,
    reason: String,
}

impl RequestParserError {
    pub fn new(position: usize, reason: &str) -> Self {
        Self {
            position,
            reason: reason.to_string(),
        }
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub type Result<T> = std::result::Result<T, RequestParserError>;

/// Frame `bytes`, see [`RequestParser::parse`].
pub fn parse(bytes: &[u8]) -> Result<Framing> {
    RequestParser::new(bytes).parse()
}

/// A not very strict HTTP/1.x request framer over an in-memory buffer.
///
/// The head (everything before the first blank line) is parsed as a request
/// line plus `Name: value` header lines. When a `Content-Length` header is
/// present the message is complete only once exactly that many body bytes
/// are buffered; without one, the message is complete as soon as the head
/// parses.
pub struct RequestParser<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> RequestParser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }
    fn error(&self, reason: &str) -> RequestParserError {
        RequestParserError::new(self.position, reason)
    }
    fn head_end(&self) -> Option<usize> {
        self.input
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)
    }
    fn request_line(&self, line: &str) -> Result<(Method, String, String, String)> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (method, target, protocol) = match parts[..] {
            [method, target, protocol] => (method, target, protocol),
            _ => return Err(self.error("expected 'METHOD target PROTOCOL'")),
        };
        let method = Method::from_str(method).map_err(|e| self.error(&e.to_string()))?;
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Ok((
            method,
            path.to_string(),
            query.to_string(),
            protocol.to_string(),
        ))
    }
    fn header(&self, line: &str) -> Result<(String, String)> {
        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(self.error("expected 'Name: value' header")),
        }
    }
    fn content_length(&self, headers: &Headers) -> Result<Option<usize>> {
        match headers.get("content-length") {
            Some(value) => match str::parse::<usize>(value) {
                Ok(length) => Ok(Some(length)),
                Err(_) => Err(self.error("invalid content-length")),
            },
            None => Ok(None),
        }
    }
    /// Attempt to frame the buffered input.
    pub fn parse(&mut self) -> Result<Framing> {
        let head_end = match self.head_end() {
            Some(end) => end,
            None => return Ok(Framing::Incomplete),
        };
        let head = std::str::from_utf8(&self.input[..head_end])
            .map_err(|e| RequestParserError::new(e.valid_up_to(), "request head is not UTF-8"))?;
        let body = &self.input[head_end + HEAD_TERMINATOR.len()..];

        let mut lines = head.split(LINE_TERMINATOR);
        let request_line = lines.next().unwrap_or_default();
        let (method, path, query, protocol) = self.request_line(request_line)?;
        self.position += request_line.len() + LINE_TERMINATOR.len();

        let mut headers = Headers::new();
        for line in lines {
            let (name, value) = self.header(line)?;
            headers.insert(&name, &value);
            self.position += line.len() + LINE_TERMINATOR.len();
        }
        self.position = head_end + HEAD_TERMINATOR.len();

        if let Some(length) = self.content_length(&headers)? {
            if body.len() < length {
                return Ok(Framing::Incomplete);
            }
            if body.len() > length {
                self.position += length;
                return Err(self.error(&format!(
                    "body exceeds content-length by {} bytes",
                    body.len() - length
                )));
            }
        }

        let mut request = Request {
            method,
            path,
            query,
            protocol,
            headers,
            body: body.to_vec(),
            params: Params::new(),
            remote_addr: None,
        };
        request.params = request_params(&request);
        Ok(Framing::Complete(request))
    }
}

fn is_form_body(request: &Request) -> bool {
    match request.headers.get("content-type") {
        Some(content_type) => content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("application/x-www-form-urlencoded"),
        None => true,
    }
}

fn request_params(request: &Request) -> Params {
    let mut params = Params::from_urlencoded(&request.query);
    if !request.body.is_empty() && is_form_body(request) {
        if let Ok(body) = std::str::from_utf8(&request.body) {
            params.merge(Params::from_urlencoded(body));
        }
    }
    params
}

#[cfg(test)]
mod test {
    use super::*;

    fn complete(bytes: &[u8]) -> Request {
        match parse(bytes).unwrap() {
            Framing::Complete(request) => request,
            Framing::Incomplete => panic!("expected a complete request"),
        }
    }

    fn test_parser_error(bytes: &[u8], expected: &RequestParserError) {
        match parse(bytes) {
            Ok(framing) => panic!("should have errored, got {:?}", framing),
            Err(actual) => assert_eq!(&actual, expected),
        }
    }

    #[test]
    fn test_parser_get() {
        let request =
            complete(b"GET /v1/my/route?p1=v1&p2=v%202 HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/v1/my/route");
        assert_eq!(request.query, "p1=v1&p2=v%202");
        assert_eq!(request.protocol, "HTTP/1.1");
        assert_eq!(request.headers.get("host"), Some("localhost"));
        assert_eq!(request.params.get("p1"), Some("v1"));
        assert_eq!(request.params.get("p2"), Some("v 2"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_parser_post_body_params() {
        let request = complete(
            b"POST /v1/people?name=query HTTP/1.0\r\nContent-Length:19\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nname=body&age=42&x=",
        );
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.protocol, "HTTP/1.0");
        assert_eq!(request.body, b"name=body&age=42&x=".to_vec());
        assert_eq!(request.params.get("name"), Some("body"));
        assert_eq!(request.params.get("age"), Some("42"));
    }

    #[test]
    fn test_parser_json_body_is_not_params() {
        let request = complete(
            b"PUT /v1/x HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}",
        );
        assert!(request.params.is_empty());
        assert_eq!(request.content_length(), 7);
    }

    #[test]
    fn test_parser_header_last_wins_case_insensitive() {
        let request = complete(b"GET / HTTP/1.1\r\nX-Thing:  one \r\nx-thing: two\r\n\r\n");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers.get("X-THING"), Some("two"));
    }

    #[test]
    fn test_parser_empty_input_incomplete() {
        assert_eq!(parse(b"").unwrap(), Framing::Incomplete);
    }

    #[test]
    fn test_parser_no_blank_line_incomplete() {
        assert_eq!(
            parse(b"GET / HTTP/1.1\r\nHost: localhost\r\n").unwrap(),
            Framing::Incomplete
        );
    }

    #[test]
    fn test_parser_short_body_incomplete() {
        assert_eq!(
            parse(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nfoo").unwrap(),
            Framing::Incomplete
        );
    }

    #[test]
    fn test_parser_chunked_feed_matches_whole() {
        let message: &[u8] =
            b"POST /v1/my/route?a=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nb=2&c=three";
        let whole = complete(message);
        for chunk_size in 1..message.len() {
            let mut buffer = vec![];
            let mut result = Framing::Incomplete;
            for chunk in message.chunks(chunk_size) {
                assert_eq!(result, Framing::Incomplete);
                buffer.extend_from_slice(chunk);
                result = parse(&buffer).unwrap();
            }
            assert_eq!(result, Framing::Complete(whole.clone()));
        }
    }

    #[test]
    fn test_parser_nonsense() {
        test_parser_error(
            b"FOO / HTTP/1.1\r\n\r\n",
            &RequestParserError::new(0, "invalid HTTP method 'FOO'"),
        );
        test_parser_error(
            b"GET /\r\n\r\n",
            &RequestParserError::new(0, "expected 'METHOD target PROTOCOL'"),
        );
    }

    #[test]
    fn test_parser_bad_header() {
        test_parser_error(
            b"GET / HTTP/1.1\r\nHost localhost\r\n\r\n",
            &RequestParserError::new(16, "expected 'Name: value' header"),
        );
    }

    #[test]
    fn test_parser_invalid_content_length() {
        let err = parse(b"GET / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").unwrap_err();
        assert_eq!(err.reason(), "invalid content-length");
    }

    #[test]
    fn test_parser_body_too_long() {
        test_parser_error(
            b"POST / HTTP/1.1\r\nContent-Length: 1\r\n\r\nfoo",
            &RequestParserError::new(39, "body exceeds content-length by 2 bytes"),
        );
    }
}
