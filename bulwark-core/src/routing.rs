// Routing: exact-path dispatch by method

use crate::filter::{HandlerFn, handler};
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::future::Future;

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
}

/// Router for dispatching requests to handlers
#[derive(Clone, Default)]
pub struct Router {
    pub routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Register an async handler for `method` and `path`.
    pub fn on<F, Fut>(mut self, method: HttpMethod, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.add_route(Route {
            method,
            path: normalize(path).to_string(),
            handler: handler(f),
        });
        self
    }

    pub fn get<F, Fut>(self, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.on(HttpMethod::GET, path, f)
    }

    pub fn post<F, Fut>(self, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.on(HttpMethod::POST, path, f)
    }

    /// Find the route matching the request and invoke it
    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (path, query) = split_query(&request.path);
        if let Some(query) = query {
            request.query_params = parse_query_string(query);
        }
        let path = normalize(path).to_string();

        let mut path_known = false;
        for route in &self.routes {
            if route.path != path {
                continue;
            }
            path_known = true;
            if route.method == request.method {
                return (route.handler)(request).await;
            }
        }

        if path_known {
            Err(Error::MethodNotAllowed(format!("{} {}", request.method, path)))
        } else {
            Err(Error::RouteNotFound(format!("{} {}", request.method, path)))
        }
    }
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Parse a query string into a map of parameters
fn parse_query_string(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}
