//! Per-endpoint call handling: route resolution, output negotiation,
//! parameter validation and handler invocation.
use log::{debug, warn};
use thiserror::Error;

use crate::config::Defaults;
use crate::endpoint::{Endpoint, Route};
use crate::request::{Method, Params, Request};
use crate::response::Response;
use crate::router::Router;

/// Body of the 500 response left when a handler never sets the response.
pub const INCOMPLETE_RESPONSE: &str = "Incomplete response data returned by endpoint";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required parameter \"{0}\" missing")]
    Missing(String),
    /// Offending parameter names, in declaration order.
    #[error("Invalid value(s) for: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No route for {method} {path}")]
    RouteNotFound { method: Method, path: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DispatchError {
    /// HTTP status this error is answered with.
    pub fn status(&self) -> u16 {
        match self {
            Self::RouteNotFound { .. } => 404,
            Self::Validation(_) => 400,
        }
    }
}

/// Check `params` against the parameter rules of `route`, returning the
/// handler name to call.
///
/// A missing required parameter fails immediately. Constraint and
/// validator failures are collected for all rules first. A constraint is an
/// unanchored regular expression; a custom validator is looked up on
/// `endpoint` and must return `true`.
pub fn validate<'r>(
    endpoint: &Endpoint,
    route: &'r Route,
    params: &Params,
) -> Result<&'r str, ValidationError> {
    let rules = match route.detail() {
        Some(detail) => &detail.parameters[..],
        None => &[],
    };
    let mut invalid = vec![];
    for (name, rule) in rules {
        let value = match params.get(name) {
            Some(value) => value,
            None if rule.required => return Err(ValidationError::Missing(name.clone())),
            None => continue,
        };
        if let Some(constraint) = &rule.constraint {
            if !constraint.is_match(value) {
                invalid.push(name.clone());
                continue;
            }
        }
        if let Some(validator) = &rule.validator {
            if !endpoint.check(validator, value) {
                invalid.push(name.clone());
            }
        }
    }
    if invalid.is_empty() {
        Ok(route.handler())
    } else {
        Err(ValidationError::Invalid(invalid))
    }
}

/// Runs one request against one endpoint.
///
/// # Example
/// ```
/// use jbapi::config::Defaults;
/// use jbapi::dispatch::{DispatchError, Dispatcher, ValidationError};
/// use jbapi::endpoint::{Endpoint, ParamRule, Route};
/// use jbapi::request::{Method, Request};
/// use jbapi::response::Response;
///
/// let endpoint = Endpoint::new()
///     .get(Route::new("/hello", "hello").param("name", ParamRule::required()))
///     .handler("hello", |params, response| {
///         response.set(format!("Hello, {}!", params.get("name").unwrap_or("")), 200)
///     });
/// let defaults = Defaults::default();
/// let dispatcher = Dispatcher::new(&endpoint, &defaults);
///
/// let request = Request::new(Method::GET, "/hello").with_param("name", "Bob");
/// let mut response = Response::new();
/// dispatcher.invoke(&request, "/hello", None, &mut response).unwrap();
/// assert_eq!(response.body().as_str(), Some("Hello, Bob!"));
///
/// let request = Request::new(Method::GET, "/hello");
/// let err = dispatcher.invoke(&request, "/hello", None, &mut Response::new()).unwrap_err();
/// assert_eq!(err, DispatchError::Validation(ValidationError::Missing("name".to_string())));
/// ```
pub struct Dispatcher<'a> {
    endpoint: &'a Endpoint,
    defaults: &'a Defaults,
}

impl<'a> Dispatcher<'a> {
    pub fn new(endpoint: &'a Endpoint, defaults: &'a Defaults) -> Self {
        Self { endpoint, defaults }
    }

    /// Dispatch `request` to the route matching `path` for the request's
    /// method, with `forced` as the transport-level output handler override.
    ///
    /// On success the response is always set: by the handler, or with route
    /// documentation (OPTIONS), or with a 500 when the handler left it
    /// unset. Route and validation failures are returned for the caller to
    /// turn into a response.
    pub fn invoke(
        &self,
        request: &Request,
        path: &str,
        forced: Option<&str>,
        response: &mut Response,
    ) -> Result<(), DispatchError> {
        let method = request.method;
        let mut router = Router::new();
        for route in self.endpoint.routes(&method) {
            router.add_route(method, route.pattern(), route);
        }
        let selected = router.select_route(&method, path);

        let detail = selected.as_ref().and_then(|(route, _)| route.detail());
        let param_name = detail
            .and_then(|d| d.output_handler_param.as_deref())
            .unwrap_or(&self.defaults.output_handler_param);
        let default_name = detail
            .and_then(|d| d.output_handler.as_deref())
            .unwrap_or(&self.defaults.output_handler);
        let mut params = request.params.clone();
        response.configure_handler(forced, param_name, default_name, &mut params);

        let routed = match selected {
            Some((route, path_params)) => {
                params.merge(path_params);
                let handler = validate(self.endpoint, route, &params)?;
                debug!("calling handler '{}' for {} {}", handler, method, path);
                if !self.endpoint.call(handler, &params, response) {
                    warn!("route {} names missing handler '{}'", route.pattern(), handler);
                }
                true
            }
            None => false,
        };

        if !response.is_set() {
            if method == Method::OPTIONS {
                response.set(self.endpoint.describe(), 200);
            } else if !routed {
                return Err(DispatchError::RouteNotFound {
                    method,
                    path: path.to_string(),
                });
            } else {
                response.set(INCOMPLETE_RESPONSE, 500);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::endpoint::ParamRule;
    use serde_json::json;

    fn endpoint() -> Endpoint {
        Endpoint::new()
            .get(
                Route::new("/my/greet", "greet")
                    .param("name", ParamRule::required().constraint("^[a-z]+$")),
            )
            .get(Route::new("/my/item/:id", "item"))
            .get(
                Route::new("/my/check", "greet")
                    .param("a", ParamRule::optional().constraint("^[0-9]+$"))
                    .param("b", ParamRule::optional().validator("short"))
                    .param("c", ParamRule::optional().validator("explodes"))
                    .param("name", ParamRule::optional()),
            )
            .get(Route::new("/my/plain", "greet").output_handler("plain"))
            .get(Route::new("/my/custom", "greet").output_handler_param("as"))
            .get(Route::new("/my/nothing", "nothing"))
            .get(Route::new("/my/ghost", "ghost"))
            .post(Route::new("/my/greet", "greet"))
            .handler("greet", |params, response| {
                let name = params.get("name").unwrap_or("nobody");
                let format_seen = params.contains("format");
                response.set(format!("hi {} {}", name, format_seen), 200)
            })
            .handler("item", |params, response| {
                response.set(params.get("id").unwrap_or(""), 200)
            })
            .handler("nothing", |_, _| {})
            .validator("short", |value| value.len() < 3)
            .validator("explodes", |_| panic!("validator failure"))
    }

    fn invoke(request: Request, path: &str) -> (Result<(), DispatchError>, Response) {
        let endpoint = endpoint();
        let defaults = Defaults::default();
        let mut response = Response::new();
        let result = Dispatcher::new(&endpoint, &defaults).invoke(&request, path, None, &mut response);
        (result, response)
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path)
    }

    #[test]
    fn test_required_missing() {
        let (result, response) = invoke(get("/my/greet"), "/my/greet");
        let err = result.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "Required parameter \"name\" missing");
        assert!(!response.is_set());
    }

    #[test]
    fn test_constraint_fails() {
        let (result, _) = invoke(get("/my/greet").with_param("name", "AB1"), "/my/greet");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid value(s) for: name"
        );
    }

    #[test]
    fn test_valid_calls_handler() {
        let (result, response) = invoke(get("/my/greet").with_param("name", "ok"), "/my/greet");
        assert!(result.is_ok());
        assert_eq!(response.status(), 200);
        assert_eq!(response.body().as_str(), Some("hi ok false"));
    }

    #[test]
    fn test_invalid_in_declaration_order() {
        let request = get("/my/check")
            .with_param("c", "x")
            .with_param("b", "toolong")
            .with_param("a", "abc");
        let (result, _) = invoke(request, "/my/check");
        assert_eq!(
            result.unwrap_err(),
            DispatchError::Validation(ValidationError::Invalid(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string()
            ]))
        );
    }

    #[test]
    fn test_constraint_is_unanchored() {
        let endpoint = Endpoint::new();
        let route = Route::new("/x", "x").param("v", ParamRule::optional().constraint("[0-9]+"));
        let params = Params::from_urlencoded("v=x1y");
        assert_eq!(validate(&endpoint, &route, &params), Ok("x"));
    }

    #[test]
    fn test_invalid_constraint_regex_rejects() {
        let endpoint = Endpoint::new();
        let route = Route::new("/x", "x").param("v", ParamRule::optional().constraint("(["));
        let params = Params::from_urlencoded("v=1");
        assert_eq!(
            validate(&endpoint, &route, &params),
            Err(ValidationError::Invalid(vec!["v".to_string()]))
        );
    }

    #[test]
    fn test_bare_route_validates_to_handler() {
        let endpoint = Endpoint::new();
        let route = Route::new("/x", "x_handler");
        assert_eq!(validate(&endpoint, &route, &Params::new()), Ok("x_handler"));
    }

    #[test]
    fn test_negotiation_consumes_param() {
        let request = get("/my/greet")
            .with_param("name", "ok")
            .with_param("format", "plain");
        let (result, response) = invoke(request, "/my/greet");
        assert!(result.is_ok());
        assert_eq!(response.output_handler(), Some("plain"));
        assert_eq!(response.body().as_str(), Some("hi ok false"));
    }

    #[test]
    fn test_route_output_overrides() {
        let (_, response) = invoke(get("/my/plain"), "/my/plain");
        assert_eq!(response.output_handler(), Some("plain"));

        let (_, response) = invoke(get("/my/plain").with_param("format", "json"), "/my/plain");
        assert_eq!(response.output_handler(), Some("json"));

        let request = get("/my/custom").with_param("as", "plain").with_param("format", "x");
        let (_, response) = invoke(request, "/my/custom");
        assert_eq!(response.output_handler(), Some("plain"));
        assert_eq!(response.body().as_str(), Some("hi nobody true"));
    }

    #[test]
    fn test_forced_handler_wins() {
        let endpoint = endpoint();
        let defaults = Defaults::default();
        let request = get("/my/greet")
            .with_param("name", "ok")
            .with_param("format", "json");
        let mut response = Response::new();
        Dispatcher::new(&endpoint, &defaults)
            .invoke(&request, "/my/greet", Some("plain"), &mut response)
            .unwrap();
        assert_eq!(response.output_handler(), Some("plain"));
    }

    #[test]
    fn test_path_params_win() {
        let (_, response) = invoke(get("/my/item/42").with_param("id", "query"), "/my/item/42");
        assert_eq!(response.body().as_str(), Some("42"));
    }

    #[test]
    fn test_method_tables_are_separate() {
        let request = Request::new(Method::POST, "/my/greet");
        let (result, response) = invoke(request, "/my/greet");
        assert!(result.is_ok());
        assert_eq!(response.body().as_str(), Some("hi nobody false"));

        let (result, _) = invoke(Request::new(Method::PUT, "/my/greet"), "/my/greet");
        assert_eq!(result.unwrap_err().status(), 404);
    }

    #[test]
    fn test_unset_response_is_500() {
        let (result, response) = invoke(get("/my/nothing"), "/my/nothing");
        assert!(result.is_ok());
        assert_eq!(response.status(), 500);
        assert_eq!(response.body().as_str(), Some(INCOMPLETE_RESPONSE));

        let (_, response) = invoke(get("/my/ghost"), "/my/ghost");
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_route_not_found() {
        let (result, _) = invoke(get("/my/unknown"), "/my/unknown");
        assert_eq!(
            result.unwrap_err(),
            DispatchError::RouteNotFound {
                method: Method::GET,
                path: "/my/unknown".to_string()
            }
        );
    }

    #[test]
    fn test_options_documents_routes() {
        let (result, response) = invoke(Request::new(Method::OPTIONS, "/my"), "/my");
        assert!(result.is_ok());
        assert_eq!(response.status(), 200);
        let docs = match response.body() {
            crate::response::Body::Structured(value) => value.clone(),
            other => panic!("expected structured docs, got {:?}", other),
        };
        assert_eq!(docs["get"]["/my/item/:id"], json!("item"));
        assert_eq!(docs["post"]["/my/greet"], json!("greet"));
        assert_eq!(docs["put"], json!({}));
        assert_eq!(
            docs["get"]["/my/greet"]["parameters"]["name"],
            json!({"required": true, "constraint": "^[a-z]+$"})
        );
    }
}
