//! Method and path based route selection.
use crate::request::{segments, Method, Params};

#[derive(Debug, Clone, PartialEq)]
enum RoutePart {
    Exact(String),
    Param(String),
    Any,
}

impl RoutePart {
    fn from_str(s: &str) -> Self {
        if s == "*" {
            Self::Any
        } else if let Some(name) = s.strip_prefix(':') {
            Self::Param(name.to_string())
        } else {
            Self::Exact(s.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RoutePath {
    parts: Vec<RoutePart>,
}

impl RoutePath {
    fn from_str(s: &str) -> Self {
        let parts: Vec<RoutePart> = segments(s).into_iter().map(RoutePart::from_str).collect();
        if parts.iter().filter(|p| **p == RoutePart::Any).count() > 1 {
            log::warn!("route pattern {} has more than one '*' and never matches", s);
        }
        Self { parts }
    }
    /// Match the whole of `path`, returning bound parameters.
    fn matches(&self, path: &[&str]) -> Option<Params> {
        let wildcard = self.parts.iter().position(|p| *p == RoutePart::Any);
        let (head, tail) = match wildcard {
            Some(i) => (&self.parts[..i], &self.parts[i + 1..]),
            None => (&self.parts[..], &[][..]),
        };
        match wildcard {
            // The wildcard takes at least one segment and as many as it can
            // while leaving exactly enough for the parts after it.
            Some(_) if path.len() < head.len() + tail.len() + 1 => return None,
            None if path.len() != head.len() => return None,
            _ => (),
        }

        let mut params = Params::new();
        let tail_start = path.len() - tail.len();
        let pairs = head
            .iter()
            .zip(&path[..head.len()])
            .chain(tail.iter().zip(&path[tail_start..]));
        for (part, segment) in pairs {
            match part {
                RoutePart::Exact(literal) if literal == segment => (),
                RoutePart::Exact(_) => return None,
                RoutePart::Param(name) => params.insert(name, &url_decode(segment)),
                RoutePart::Any => return None,
            }
        }
        Some(params)
    }
}

fn url_decode(segment: &str) -> String {
    let segment = segment.replace('+', " ");
    match urlencoding::decode(&segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment,
    }
}

struct Route<T> {
    method: Method,
    pattern: String,
    path: RoutePath,
    data: T,
}

/// An ordered route table. Selection returns the first route, in
/// registration order, whose method matches and whose pattern matches the
/// entire path.
///
/// # Route patterns
/// * `/foo`: matches exactly /foo
/// * `/foo/:name`: matches /foo/bar, binds name="bar" (URL-decoded)
/// * `/foo/*`: matches /foo/bar, /foo/bar/baz, ... (one or more segments)
/// * `/foo/*/baz`: the wildcard takes everything between /foo and a final /baz
///
/// A pattern holds at most one `*`; a pattern with two never matches.
///
/// Patterns are not deduplicated; a route registered after an identical one
/// is never selected.
///
/// # Example
/// ```
/// use jbapi::request::Method;
/// use jbapi::router::Router;
///
/// let router = Router::new()
///     .with_route(Method::GET, "/my/:id", "by_id")
///     .with_route(Method::GET, "/my/*", "any");
///
/// let (data, params) = router.select_route(&Method::GET, "/my/42").unwrap();
/// assert_eq!(*data, "by_id");
/// assert_eq!(params.get("id"), Some("42"));
///
/// let (data, _) = router.select_route(&Method::GET, "/my/42/43").unwrap();
/// assert_eq!(*data, "any");
/// ```
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self { routes: vec![] }
    }
    pub fn add_route(&mut self, method: Method, pattern: &str, data: T) {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            path: RoutePath::from_str(pattern),
            data,
        });
    }
    pub fn with_route(mut self, method: Method, pattern: &str, data: T) -> Self {
        self.add_route(method, pattern, data);
        self
    }
    pub fn select_route(&self, method: &Method, path: &str) -> Option<(&T, Params)> {
        let requested = segments(path);
        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            if let Some(params) = route.path.matches(&requested) {
                log::trace!("{} {} matched route {}", method, path, route.pattern);
                return Some((&route.data, params));
            }
        }
        None
    }
    pub fn len(&self) -> usize {
        self.routes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
