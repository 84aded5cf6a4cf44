use crate::config::CsrfConfig;
use crate::context::RequestCsrfExt;
use crate::error::CsrfError;
use crate::repository::CsrfTokenRepository;
use crate::token::CsrfToken;
use async_trait::async_trait;
use bulwark_core::{Error, Filter, HttpRequest, HttpResponse, Next};
use std::sync::Arc;
use tracing::{debug, warn};

/// CSRF protection stage.
///
/// Every non-excluded request gets the client's current token (created on
/// first contact) attached to its context. Unsafe methods must echo that
/// token in the configured header or body field.
pub struct CsrfFilter<R> {
    repository: Arc<R>,
    config: Arc<CsrfConfig>,
}

impl<R> Clone for CsrfFilter<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: CsrfTokenRepository> CsrfFilter<R> {
    pub fn new(repository: Arc<R>, config: CsrfConfig) -> Self {
        Self {
            repository,
            config: Arc::new(config),
        }
    }

    /// Check if request needs CSRF protection
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        !self.config.is_safe_method(request.method.as_str())
            && !self.config.is_excluded(&request.path)
    }

    /// Current token for the client, generating and saving one if none exists.
    async fn current_token(&self, request: &mut HttpRequest) -> Result<CsrfToken, CsrfError> {
        if let Some(token) = self.repository.load_token(request).await? {
            return Ok(token);
        }

        let generated = self.repository.generate_token(request);
        self.repository.save_token(&generated, request).await?;

        // A racing save may have won; the context holds what the store kept.
        let issued = request
            .csrf_token()
            .map(|persisted| persisted.token().clone())
            .unwrap_or(generated);
        debug!(path = %request.path, "Issued new CSRF token");
        Ok(issued)
    }

    /// Submitted token: header first, then body field
    fn submitted_token(&self, request: &HttpRequest) -> Option<String> {
        self.token_from_header(request)
            .or_else(|| self.token_from_body(request))
    }

    fn token_from_header(&self, request: &HttpRequest) -> Option<String> {
        request
            .header(&self.config.header_name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn token_from_body(&self, request: &HttpRequest) -> Option<String> {
        if request.body.is_empty() {
            return None;
        }

        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&request.body) {
            return json
                .get(&self.config.parameter_name)
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }

        serde_urlencoded::from_bytes::<Vec<(String, String)>>(&request.body)
            .ok()?
            .into_iter()
            .find(|(key, _)| *key == self.config.parameter_name)
            .map(|(_, value)| value)
    }

    fn verify(&self, expected: &CsrfToken, request: &HttpRequest) -> Result<(), CsrfError> {
        let submitted = self.submitted_token(request).ok_or(CsrfError::MissingToken)?;
        if !expected.matches(&submitted) {
            warn!(
                path = %request.path,
                method = %request.method,
                "CSRF token mismatch"
            );
            return Err(CsrfError::TokenMismatch);
        }
        Ok(())
    }
}

#[async_trait]
impl<R: CsrfTokenRepository + 'static> Filter for CsrfFilter<R> {
    fn name(&self) -> &'static str {
        "CsrfFilter"
    }

    async fn filter(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        if self.config.is_excluded(&req.path) {
            return next(req).await;
        }

        let protect = self.needs_protection(&req);
        let token = match self.current_token(&mut req).await {
            Ok(token) => Some(token),
            // Without an identifier there is no token to issue; reads still pass.
            Err(CsrfError::MissingIdentifier { header }) if !protect => {
                debug!(header = %header, "No client identifier, skipping token issue");
                None
            }
            Err(err) => return Err(err.into()),
        };

        if protect {
            // `protect` with no token is unreachable: the lookup error returned above.
            let Some(expected) = token.as_ref() else {
                return Err(CsrfError::MissingToken.into());
            };
            self.verify(expected, &req)?;
        }

        let response = next(req).await?;
        Ok(match token {
            Some(token) => response.with_header(token.header_name, token.value),
            None => response,
        })
    }
}
