use async_trait::async_trait;
use bulwark_core::*;
use tokio_test::block_on;

#[derive(Debug, PartialEq)]
struct Stamp(&'static str);

/// Writes a typed value into the request before passing it on.
struct StampFilter;

#[async_trait]
impl Filter for StampFilter {
    async fn filter(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse> {
        req.extensions.insert(Stamp("stamped"));
        next(req).await
    }
}

/// Refuses every POST.
struct DenyPost;

#[async_trait]
impl Filter for DenyPost {
    async fn filter(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        if req.method == HttpMethod::POST {
            return Err(Error::Forbidden("no posts".to_string()));
        }
        next(req).await
    }
}

fn app() -> Application {
    let router = Router::new()
        .get("/", |req: HttpRequest| async move {
            let stamp = req.extensions.get::<Stamp>().map(|s| s.0).unwrap_or("none");
            Ok(HttpResponse::text(stamp))
        })
        .post("/", |_req| async { Ok(HttpResponse::text("posted")) });

    Application::new(router)
        .with_filter(StampFilter)
        .with_filter(DenyPost)
}

#[tokio::test]
async fn test_filter_writes_reach_handler() {
    let response = app().handle(HttpRequest::new(HttpMethod::GET, "/")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "stamped");
}

#[tokio::test]
async fn test_filter_short_circuit_renders_error() {
    let response = app().handle(HttpRequest::new(HttpMethod::POST, "/")).await;
    assert_eq!(response.status, 403);

    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["status"], 403);
    assert_eq!(body["error"], "Forbidden: no posts");
}

#[tokio::test]
async fn test_extensions_do_not_leak_between_requests() {
    let app = app();
    let first = HttpRequest::new(HttpMethod::GET, "/");
    let second = HttpRequest::new(HttpMethod::GET, "/");

    assert!(first.extensions.is_empty());
    app.handle(first).await;
    assert!(second.extensions.get::<Stamp>().is_none());
}

#[test]
fn test_handle_outside_runtime_macro() {
    let response = block_on(app().handle(HttpRequest::new(HttpMethod::GET, "/")));
    assert_eq!(response.status, 200);
}
