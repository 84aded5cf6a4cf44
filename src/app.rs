//! Demo application: a landing route, a form page carrying the client's
//! token, and the protected verification endpoint.

use crate::config::{AppConfig, AppError};
use bulwark_core::{Application, Error, HttpRequest, HttpResponse, Result, Router};
use bulwark_csrf::{
    CsrfConfig, CsrfFilter, CsrfLoggingFilter, CsrfRequestToken, CsrfTokenRepository,
    RequestCsrfExt, SeaOrmTokenStore, StoreTokenRepository, TokenStore,
};
use std::sync::Arc;
use tracing::info;

pub const HOME_MESSAGE: &str = "Hello CSRF Filter...";

pub const VALID_USER_HTML: &str = r#"<h1 style="color:green">Valid User :)</h1>"#;

/// Routes without any filters
pub fn router() -> Router {
    Router::new()
        .get("/", home)
        .get("/page", page)
        .post("/verify", verify)
}

/// Wire the CSRF filter, the token logger and the routes, in that order.
pub fn build<R>(config: &CsrfConfig, repository: Arc<R>) -> Application
where
    R: CsrfTokenRepository + 'static,
{
    Application::new(router())
        .with_filter(CsrfFilter::new(repository, config.clone()))
        .with_filter(CsrfLoggingFilter)
}

/// Connect the token store and serve until ctrl-c.
pub async fn run(config: AppConfig) -> std::result::Result<(), AppError> {
    let addr = config.server.socket_addr()?;

    let store = Arc::new(SeaOrmTokenStore::connect(&config.database).await?);
    store.health_check().await?;

    let repository = Arc::new(StoreTokenRepository::new(store, config.csrf.clone()));
    let app = build(&config.csrf, repository);

    info!(
        %addr,
        identifier_header = %config.csrf.identifier_header,
        missing_identifier = ?config.csrf.missing_identifier,
        "Starting bulwark"
    );
    app.listen(addr).await?;
    Ok(())
}

async fn home(_req: HttpRequest) -> Result<HttpResponse> {
    Ok(HttpResponse::text(HOME_MESSAGE))
}

async fn page(req: HttpRequest) -> Result<HttpResponse> {
    let token = req
        .csrf_token()
        .ok_or_else(|| Error::Internal("no CSRF token in request context".to_string()))?;
    Ok(HttpResponse::html(render_form(token)))
}

/// Verification entry point. Reaching it means the filter accepted the token.
async fn verify(_req: HttpRequest) -> Result<HttpResponse> {
    Ok(HttpResponse::html(VALID_USER_HTML))
}

fn render_form(token: &CsrfRequestToken) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>CSRF demo</title></head>
<body>
<p>Send this token back in the <code>{header}</code> header or the <code>{field}</code> field.</p>
<form method="post" action="/verify">
<input type="hidden" name="{field}" value="{value}"/>
<button type="submit">Verify</button>
</form>
</body>
</html>
"#,
        header = escape_html(&token.header_name),
        field = escape_html(token.attribute_name()),
        value = escape_html(&token.value),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_csrf::CsrfToken;

    #[test]
    fn test_render_form_embeds_token() {
        let token = CsrfRequestToken(CsrfToken::new("X-CSRF-TOKEN", "_csrf", "abc-123"));
        let html = render_form(&token);

        assert!(html.contains(r#"name="_csrf" value="abc-123""#));
        assert!(html.contains(r#"action="/verify""#));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
