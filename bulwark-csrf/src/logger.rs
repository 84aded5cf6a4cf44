use crate::context::RequestCsrfExt;
use async_trait::async_trait;
use bulwark_core::{Error, Filter, HttpRequest, HttpResponse, Next};
use tracing::debug;

/// Logs the token attached to each request. Register after [`crate::CsrfFilter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfLoggingFilter;

#[async_trait]
impl Filter for CsrfLoggingFilter {
    fn name(&self) -> &'static str {
        "CsrfLoggingFilter"
    }

    async fn filter(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        match req.csrf_token() {
            Some(token) => debug!(
                path = %req.path,
                attribute = token.attribute_name(),
                token = %token.masked(),
                "CSRF token in request context"
            ),
            None => debug!(path = %req.path, "No CSRF token in request context"),
        }
        next(req).await
    }
}
