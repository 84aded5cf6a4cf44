// Application: filter chain + router, served over hyper

use crate::filter::{FilterChain, HandlerFn, handler};
use crate::{Error, Filter, HttpMethod, HttpRequest, HttpResponse, Router};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// The runnable application: every request passes the filter chain and is
/// then dispatched by the router.
#[derive(Clone)]
pub struct Application {
    filters: FilterChain,
    router: Arc<Router>,
}

impl Application {
    pub fn new(router: Router) -> Self {
        Self {
            filters: FilterChain::new(),
            router: Arc::new(router),
        }
    }

    /// Append a filter (builder style).
    pub fn with_filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.add_filter(filter);
        self
    }

    /// Append a shared filter (builder style).
    pub fn with_shared_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.add_shared(filter);
        self
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Process one request in-process. Errors become JSON error responses.
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let router = self.router.clone();
        let terminal: HandlerFn = handler(move |req| {
            let router = router.clone();
            async move { router.route(req).await }
        });

        match self.filters.execute(req, terminal).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }

    /// Serve HTTP/1.1 on `addr` until ctrl-c.
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Server listening");

        let app = Arc::new(self);
        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let app = app.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let app = app.clone();
                    async move { serve_request(req, app).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(%peer, error = %err, "Error serving connection");
                }
            });
        }
    }
}

/// Render an error as `{"error": ..., "status": ...}`
pub fn error_response(err: &Error) -> HttpResponse {
    let status = err.status_code();
    if err.is_server_error() {
        error!(status, error = %err, "Request failed");
    } else {
        debug!(status, error = %err, "Request rejected");
    }
    let body = serde_json::json!({
        "error": err.to_string(),
        "status": status,
    });
    HttpResponse::new(status)
        .with_json(&body)
        .unwrap_or_else(|_| HttpResponse::new(status))
}

async fn serve_request(
    req: Request<IncomingBody>,
    app: Arc<Application>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let Some(method) = HttpMethod::from_str(req.method().as_str()) else {
        let err = Error::MethodNotAllowed(req.method().to_string());
        return Ok(into_hyper_response(error_response(&err)));
    };

    let path = match req.uri().query() {
        Some(query) => format!("{}?{}", req.uri().path(), query),
        None => req.uri().path().to_string(),
    };
    let mut request = HttpRequest::new(method, path);

    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request.headers.insert(name.to_string(), value.to_string());
        }
    }

    request.body = req.collect().await?.to_bytes().to_vec();

    let response = app.handle(request).await;
    Ok(into_hyper_response(response))
}

fn into_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in response.headers {
        builder = builder.header(key, value);
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|err| {
            error!(error = %err, "Invalid response parts");
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = Application::new(Router::new());
        let response = app.handle(HttpRequest::new(HttpMethod::GET, "/missing")).await;

        assert_eq!(response.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["status"], 404);
    }

    #[test]
    fn test_into_hyper_response() {
        let response = into_hyper_response(HttpResponse::text("hi").with_header("X-A", "1"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-a").unwrap(), "1");
    }
}
