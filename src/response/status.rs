//! Status codes, reason phrases and the status line.

/// Reason phrase for a supported status code.
pub fn reason(status_code: u16) -> Option<&'static str> {
    let reason = match status_code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(reason)
}

/// Reason phrase for `status_code`, falling back to the 500 phrase.
pub fn default(status_code: u16) -> String {
    reason(status_code)
        .unwrap_or("Internal Server Error")
        .to_string()
}

const DEFAULT_PROTOCOL: &str = "HTTP/1.1";

/// Build the status line for a response to a request made with `protocol`.
///
/// Codes outside the table become 500. A protocol other than HTTP/1.0 or
/// HTTP/1.1 forces 505 and an HTTP/1.1 status line. Returns the code
/// actually sent along with the line.
pub fn status_line(protocol: Option<&str>, status_code: u16) -> (u16, String) {
    let protocol = protocol.unwrap_or(DEFAULT_PROTOCOL);
    let (protocol, status_code) = match protocol {
        "HTTP/1.0" | "HTTP/1.1" => (protocol, status_code),
        _ => (DEFAULT_PROTOCOL, 505),
    };
    let status_code = if reason(status_code).is_some() {
        status_code
    } else {
        500
    };
    (
        status_code,
        format!("{} {} {}", protocol, status_code, default(status_code)),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(Some("HTTP/1.0"), 200),
            (200, "HTTP/1.0 200 OK".to_string())
        );
        assert_eq!(
            status_line(None, 404),
            (404, "HTTP/1.1 404 Not Found".to_string())
        );
    }

    #[test]
    fn test_unknown_code_is_500() {
        assert_eq!(
            status_line(Some("HTTP/1.1"), 299),
            (500, "HTTP/1.1 500 Internal Server Error".to_string())
        );
        assert_eq!(reason(418), None);
    }

    #[test]
    fn test_unsupported_protocol_forces_505() {
        assert_eq!(
            status_line(Some("HTTP/2.0"), 200),
            (505, "HTTP/1.1 505 HTTP Version Not Supported".to_string())
        );
    }
}
