//! Endpoints: sets of routes per HTTP method, plus the handler and
//! validator functions those routes name.
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::warn;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::request::{Method, Params};
use crate::response::Response;

/// A handler function. It reads the merged request parameters and is
/// expected to set the response.
pub type HandlerFunc = Box<dyn Fn(&Params, &mut Response) + Send + Sync>;

/// A custom parameter validator. Only `true` accepts the value.
pub type ValidatorFunc = Box<dyn Fn(&str) -> bool + Send + Sync>;

fn is_false(b: &bool) -> bool {
    !*b
}

/// An unanchored regular expression a parameter value must match, compiled
/// once when the rule is built. A pattern that fails to compile matches
/// nothing.
#[derive(Debug, Clone)]
pub struct Constraint {
    pattern: String,
    regex: Option<Regex>,
}

impl Constraint {
    pub fn new(pattern: &str) -> Self {
        let regex = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("invalid parameter constraint '{}': {}", pattern, e);
                None
            }
        };
        Self {
            pattern: pattern.to_string(),
            regex,
        }
    }
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.as_ref().map_or(false, |re| re.is_match(value))
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Constraint {}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

/// Validation rule for one named parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParamRule {
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
    /// Name of a validator registered on the endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamRule {
    pub fn optional() -> Self {
        Self::default()
    }
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }
    pub fn constraint(mut self, regex: &str) -> Self {
        self.constraint = Some(Constraint::new(regex));
        self
    }
    pub fn validator(mut self, name: &str) -> Self {
        self.validator = Some(name.to_string());
        self
    }
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }
}

/// Optional route details: parameter rules (in declaration order) and
/// output handler overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDetail {
    pub parameters: Vec<(String, ParamRule)>,
    pub output_handler: Option<String>,
    pub output_handler_param: Option<String>,
}

/// A path pattern bound to a handler name.
///
/// # Example
/// ```
/// use jbapi::endpoint::{ParamRule, Route};
///
/// let route = Route::new("/hello/:name", "hello")
///     .param("name", ParamRule::required().constraint("^[a-z]+$"))
///     .output_handler("plain");
/// assert_eq!(route.handler(), "hello");
/// assert_eq!(route.detail().unwrap().parameters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
    handler: String,
    detail: Option<RouteDetail>,
}

impl Route {
    pub fn new(pattern: &str, handler: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            handler: handler.to_string(),
            detail: None,
        }
    }
    fn detail_mut(&mut self) -> &mut RouteDetail {
        self.detail.get_or_insert_with(RouteDetail::default)
    }
    pub fn param(mut self, name: &str, rule: ParamRule) -> Self {
        self.detail_mut().parameters.push((name.to_string(), rule));
        self
    }
    pub fn output_handler(mut self, name: &str) -> Self {
        self.detail_mut().output_handler = Some(name.to_string());
        self
    }
    pub fn output_handler_param(mut self, name: &str) -> Self {
        self.detail_mut().output_handler_param = Some(name.to_string());
        self
    }
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
    pub fn handler(&self) -> &str {
        &self.handler
    }
    pub fn detail(&self) -> Option<&RouteDetail> {
        self.detail.as_ref()
    }
    /// Documentation form: the bare handler name, or an object when the
    /// route has details.
    pub fn describe(&self) -> Value {
        let detail = match &self.detail {
            Some(detail) => detail,
            None => return Value::String(self.handler.clone()),
        };
        let mut out = Map::new();
        out.insert("function".to_string(), json!(self.handler));
        if !detail.parameters.is_empty() {
            let parameters: Map<String, Value> = detail
                .parameters
                .iter()
                .map(|(name, rule)| (name.clone(), json!(rule)))
                .collect();
            out.insert("parameters".to_string(), Value::Object(parameters));
        }
        if let Some(name) = &detail.output_handler {
            out.insert("output_handler".to_string(), json!(name));
        }
        if let Some(name) = &detail.output_handler_param {
            out.insert("output_handler_param".to_string(), json!(name));
        }
        Value::Object(out)
    }
}

/// The HTTP methods an endpoint keeps route tables for.
pub const ROUTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// A set of routes and the functions they name.
///
/// # Example
/// ```
/// use jbapi::endpoint::{Endpoint, Route};
/// use jbapi::request::{Method, Params};
/// use jbapi::response::Response;
///
/// let endpoint = Endpoint::new()
///     .get(Route::new("/my/route", "myfunction"))
///     .handler("myfunction", |_params, response| {
///         response.set("This is the response", 200)
///     });
///
/// let mut response = Response::new();
/// assert!(endpoint.call("myfunction", &Params::new(), &mut response));
/// assert_eq!(response.status(), 200);
/// assert_eq!(endpoint.routes(&Method::GET).len(), 1);
/// ```
#[derive(Default)]
pub struct Endpoint {
    get: Vec<Route>,
    post: Vec<Route>,
    put: Vec<Route>,
    delete: Vec<Route>,
    handlers: HashMap<String, HandlerFunc>,
    validators: HashMap<String, ValidatorFunc>,
}

impl Endpoint {
    pub fn new() -> Self {
        Self::default()
    }
    /// Append `route` to the table for `method`. Only GET, POST, PUT and
    /// DELETE have tables; routes for other methods are dropped.
    pub fn route(mut self, method: Method, route: Route) -> Self {
        match method {
            Method::GET => self.get.push(route),
            Method::POST => self.post.push(route),
            Method::PUT => self.put.push(route),
            Method::DELETE => self.delete.push(route),
            other => warn!("no route table for {}, dropping {}", other, route.pattern),
        }
        self
    }
    pub fn get(self, route: Route) -> Self {
        self.route(Method::GET, route)
    }
    pub fn post(self, route: Route) -> Self {
        self.route(Method::POST, route)
    }
    pub fn put(self, route: Route) -> Self {
        self.route(Method::PUT, route)
    }
    pub fn delete(self, route: Route) -> Self {
        self.route(Method::DELETE, route)
    }
    pub fn handler<F>(mut self, name: &str, f: F) -> Self
    where
        F: 'static + Fn(&Params, &mut Response) + Send + Sync,
    {
        self.handlers.insert(name.to_string(), Box::new(f));
        self
    }
    pub fn validator<F>(mut self, name: &str, f: F) -> Self
    where
        F: 'static + Fn(&str) -> bool + Send + Sync,
    {
        self.validators.insert(name.to_string(), Box::new(f));
        self
    }
    pub fn routes(&self, method: &Method) -> &[Route] {
        match method {
            Method::GET => &self.get,
            Method::POST => &self.post,
            Method::PUT => &self.put,
            Method::DELETE => &self.delete,
            _ => &[],
        }
    }
    /// All four route tables, keyed by lowercase method then pattern, in
    /// registration order. A pattern registered twice is documented by its
    /// first route, the one requests reach.
    pub fn describe(&self) -> Value {
        let mut out = Map::new();
        for method in ROUTED_METHODS.iter() {
            let mut table = Map::new();
            for route in self.routes(method) {
                table
                    .entry(route.pattern.clone())
                    .or_insert_with(|| route.describe());
            }
            out.insert(method.as_str().to_ascii_lowercase(), Value::Object(table));
        }
        Value::Object(out)
    }
    /// Run the handler called `name`. Returns false if there is none.
    pub fn call(&self, name: &str, params: &Params, response: &mut Response) -> bool {
        match self.handlers.get(name) {
            Some(handler) => {
                handler(params, response);
                true
            }
            None => false,
        }
    }
    /// Run the validator called `name` on `value`. An unknown validator or
    /// a panicking one rejects the value.
    pub fn check(&self, name: &str, value: &str) -> bool {
        let validator = match self.validators.get(name) {
            Some(validator) => validator,
            None => {
                warn!("no validator named '{}'", name);
                return false;
            }
        };
        match panic::catch_unwind(AssertUnwindSafe(|| validator(value))) {
            Ok(valid) => valid,
            Err(_) => {
                warn!("validator '{}' panicked", name);
                false
            }
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&String> = self.handlers.keys().collect();
        handlers.sort();
        let mut validators: Vec<&String> = self.validators.keys().collect();
        validators.sort();
        f.debug_struct("Endpoint")
            .field("get", &self.get)
            .field("post", &self.post)
            .field("put", &self.put)
            .field("delete", &self.delete)
            .field("handlers", &handlers)
            .field("validators", &validators)
            .finish()
    }
}
