//! The endpoint registry and the outermost request boundary.
//!
//! Requests are addressed as `/<version>/<name>[.<handler>]/<rest...>`. The
//! endpoint registered as `(name, version)` is dispatched with the path
//! `/<name>/<rest...>`, so its routes are declared with the endpoint name as
//! first segment. Each endpoint constructor runs once, at registration.
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, warn};
use serde_json::json;

use crate::config::Defaults;
use crate::content::{OutputHandler, OutputRegistry};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::endpoint::Endpoint;
use crate::request::Request;
use crate::response::{status, Encoded, Response};

/// Error message for requests that address no registered endpoint.
pub const ENDPOINT_NOT_FOUND: &str = "Requested endpoint is not implemented";

struct Registration {
    name: String,
    version: String,
    endpoint: Endpoint,
}

/// A set of versioned endpoints plus the output handlers and negotiation
/// defaults they share. Read-only once serving starts.
///
/// # Example
/// ```
/// use jbapi::app::App;
/// use jbapi::endpoint::{Endpoint, Route};
/// use jbapi::request::{Method, Request};
///
/// let app = App::new().with_endpoint("my", "v1", || {
///     Endpoint::new()
///         .get(Route::new("/my/route", "myfunction"))
///         .handler("myfunction", |_, response| {
///             response.set("This is the response", 200)
///         })
/// });
///
/// let request = Request::new(Method::GET, "/v1/my.plain/route");
/// let encoded = app.respond(&request);
/// assert_eq!(encoded.status, 200);
/// assert_eq!(encoded.body, b"This is the response".to_vec());
/// ```
pub struct App {
    registrations: Vec<Registration>,
    outputs: OutputRegistry,
    defaults: Defaults,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An app with the reference output handlers and default negotiation.
    pub fn new() -> Self {
        Self {
            registrations: vec![],
            outputs: OutputRegistry::new(),
            defaults: Defaults::default(),
        }
    }
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }
    pub fn with_outputs(mut self, outputs: OutputRegistry) -> Self {
        self.outputs = outputs;
        self
    }
    pub fn with_output_handler<H>(mut self, name: &str, handler: H) -> Self
    where
        H: 'static + OutputHandler,
    {
        self.outputs.register(name, handler);
        self
    }
    /// Build an endpoint with `constructor` and register it under
    /// `(name, version)`. A second registration for the same pair replaces
    /// the first.
    pub fn register<F>(&mut self, name: &str, version: &str, constructor: F)
    where
        F: FnOnce() -> Endpoint,
    {
        let registration = Registration {
            name: name.to_string(),
            version: version.to_string(),
            endpoint: constructor(),
        };
        match self.position(name, version) {
            Some(i) => {
                warn!("replacing endpoint {}/{}", version, name);
                self.registrations[i] = registration;
            }
            None => self.registrations.push(registration),
        }
    }
    pub fn with_endpoint<F>(mut self, name: &str, version: &str, constructor: F) -> Self
    where
        F: FnOnce() -> Endpoint,
    {
        self.register(name, version, constructor);
        self
    }
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }
    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    fn position(&self, name: &str, version: &str) -> Option<usize> {
        self.registrations
            .iter()
            .position(|r| r.name == name && r.version == version)
    }

    /// Registered endpoints grouped by version, names sorted.
    pub fn endpoints(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut endpoints: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for registration in &self.registrations {
            endpoints
                .entry(registration.version.as_str())
                .or_default()
                .push(registration.name.as_str());
        }
        for names in endpoints.values_mut() {
            names.sort_unstable();
        }
        endpoints
    }

    fn not_found(&self, response: &mut Response, message: &str) {
        response.set(json!({"error": message, "endpoints": self.endpoints()}), 404);
    }

    /// Route `request` to its endpoint and return the unencoded response.
    /// Every failure, including a panicking handler, becomes a response.
    pub fn handle(&self, request: &Request) -> Response {
        let mut response = Response::new();
        let segments = request.segments();
        let (version, segment) = match (segments.first(), segments.get(1)) {
            (Some(version), Some(segment)) => (*version, *segment),
            _ => {
                self.negotiate(None, request, &mut response);
                self.not_found(&mut response, ENDPOINT_NOT_FOUND);
                return response;
            }
        };
        let (name, forced) = match segment.rsplit_once('.') {
            Some((name, handler)) => (name, Some(handler)),
            None => (segment, None),
        };
        let registration = match self.position(name, version) {
            Some(i) => &self.registrations[i],
            None => {
                debug!("no endpoint {}/{}", version, name);
                self.negotiate(forced, request, &mut response);
                self.not_found(&mut response, ENDPOINT_NOT_FOUND);
                return response;
            }
        };

        let mut path = format!("/{}", name);
        for segment in &segments[2..] {
            path.push('/');
            path.push_str(segment);
        }
        if self.defaults.response_detail {
            response.set_detail(name, version);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            Dispatcher::new(&registration.endpoint, &self.defaults).invoke(
                request,
                &path,
                forced,
                &mut response,
            )
        }));
        match outcome {
            Ok(Ok(())) => (),
            Ok(Err(e @ DispatchError::RouteNotFound { .. })) => {
                debug!("{}", e);
                self.not_found(&mut response, &e.to_string());
            }
            Ok(Err(e)) => {
                debug!("{}", e);
                response.set(e.to_string(), e.status());
            }
            Err(_) => {
                error!("endpoint {}/{} panicked on {} {}", version, name, request.method, path);
                response = Response::new();
                response.set(status::default(500), 500);
            }
        }
        response
    }

    fn negotiate(&self, forced: Option<&str>, request: &Request, response: &mut Response) {
        let mut params = request.params.clone();
        response.configure_handler(
            forced,
            &self.defaults.output_handler_param,
            &self.defaults.output_handler,
            &mut params,
        );
    }

    /// Handle and encode `request`, for a host that frames HTTP itself.
    pub fn respond(&self, request: &Request) -> Encoded {
        let mut response = self.handle(request);
        response.send(&self.outputs, Some(&request.protocol))
    }

    /// A plain text error response for a request that could not be framed.
    pub fn reject(&self, message: &str, status: u16) -> Encoded {
        let mut response = Response::new();
        response.set(message, status);
        response.send(&self.outputs, None)
    }

    /// `version/name` of every registered endpoint, in registration order.
    pub fn describe_endpoints(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|r| format!("{}/{}", r.version, r.name))
            .collect()
    }
}
