use axum::extract::{Extension, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use crate::storage::{Record, Storage};
use crate::web::body::JsonBody;
use crate::web::response::ErrorResponse;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A route handler: receives the store and the matched request.
pub type Handler = fn(Arc<Storage>, RouteRequest) -> HandlerFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path template such as `/tasks/:id/complete`.
///
/// Matching compares the request path segment by segment against the
/// template. Literal segments must be equal, `:name` segments capture any
/// non-empty text without a `/`. Anything after the first `?` is kept aside
/// as the raw query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    template: String,
    segments: Vec<Segment>,
}

/// Captures produced by a successful [`RoutePath::matches`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteMatch {
    pub params: HashMap<String, String>,
    pub query: Option<String>,
}

impl RoutePath {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self {
            template: template.to_string(),
            segments,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Matches a request target (path plus optional `?query`) against the template.
    pub fn matches(&self, target: &str) -> Option<RouteMatch> {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };

        let mut actual = path.split('/');
        let mut params = HashMap::new();
        for segment in &self.segments {
            let value = actual.next()?;
            match segment {
                Segment::Literal(literal) if literal == value => {}
                Segment::Param(name) if !value.is_empty() => {
                    params.insert(name.clone(), value.to_string());
                }
                _ => return None,
            }
        }
        if actual.next().is_some() {
            return None;
        }

        Some(RouteMatch { params, query })
    }
}

/// Parses `key=value&key2=value2` into a map.
///
/// Values are kept verbatim, without percent-decoding. A pair without `=`
/// maps to an empty value and later duplicates win.
pub fn extract_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// What a handler sees of a matched request.
#[derive(Debug, Default, Clone)]
pub struct RouteRequest {
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Record,
}

impl RouteRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

pub struct Route {
    method: Method,
    path: RoutePath,
    handler: Handler,
}

impl Route {
    pub fn new(method: Method, template: &str, handler: Handler) -> Self {
        Self {
            method,
            path: RoutePath::parse(template),
            handler,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &RoutePath {
        &self.path
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path.template())
            .finish()
    }
}

/// Ordered route table bound to a store. The first matching route wins.
#[derive(Debug)]
pub struct Dispatcher {
    storage: Arc<Storage>,
    routes: Vec<Route>,
}

impl Dispatcher {
    /// Creates a dispatcher serving the task routes.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self::with_routes(storage, crate::task::handlers::routes())
    }

    pub fn with_routes(storage: Arc<Storage>, routes: Vec<Route>) -> Self {
        Self { storage, routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Runs the first route matching `method` and `target`, or answers 404.
    pub async fn dispatch(&self, method: &Method, target: &str, body: Record) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            if route.method != *method {
                return None;
            }
            route.path.matches(target).map(|found| (route, found))
        });

        match matched {
            Some((route, found)) => {
                tracing::debug!("{} {} matched {}", method, target, route.path.template());
                let request = RouteRequest {
                    params: found.params,
                    query: found
                        .query
                        .as_deref()
                        .map(extract_query_params)
                        .unwrap_or_default(),
                    body,
                };
                (route.handler)(self.storage.clone(), request).await
            }
            None => {
                tracing::debug!("No route for {} {}", method, target);
                ErrorResponse::new(
                    StatusCode::NOT_FOUND,
                    format!("Can't find this route: {}", target),
                )
                .into_response()
            }
        }
    }
}

/// Router fallback that hands every request to the [`Dispatcher`].
pub async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    body: Option<Extension<JsonBody>>,
) -> Response {
    let target = uri
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .unwrap_or_else(|| uri.path());
    let body = body
        .map(|Extension(JsonBody(body))| body)
        .unwrap_or_default();

    dispatcher.dispatch(&method, target, body).await
}
