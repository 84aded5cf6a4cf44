//! Token repository: the generate / save / load contract the CSRF filter
//! drives, backed by a [`TokenStore`].

use crate::config::{CsrfConfig, MissingIdentifierPolicy};
use crate::context;
use crate::error::{CsrfError, Result};
use crate::store::{TokenRecord, TokenStore};
use crate::token::CsrfToken;
use async_trait::async_trait;
use bulwark_core::HttpRequest;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callbacks the CSRF filter uses to obtain and persist per-client tokens
#[async_trait]
pub trait CsrfTokenRepository: Send + Sync {
    /// Produce a fresh token. Does not touch storage.
    fn generate_token(&self, request: &HttpRequest) -> CsrfToken;

    /// Persist `token` for the requesting client and attach it to the request.
    async fn save_token(&self, token: &CsrfToken, request: &mut HttpRequest) -> Result<()>;

    /// Fetch the client's current token, attaching it to the request when found.
    async fn load_token(&self, request: &mut HttpRequest) -> Result<Option<CsrfToken>>;
}

/// [`CsrfTokenRepository`] over any [`TokenStore`]
pub struct StoreTokenRepository<S> {
    store: Arc<S>,
    config: Arc<CsrfConfig>,
}

impl<S> Clone for StoreTokenRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: TokenStore> StoreTokenRepository<S> {
    pub fn new(store: Arc<S>, config: CsrfConfig) -> Self {
        Self::with_shared_config(store, Arc::new(config))
    }

    pub fn with_shared_config(store: Arc<S>, config: Arc<CsrfConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Client identifier for `request`, after applying the missing-identifier
    /// policy. Blank header values count as absent.
    pub fn resolve_identifier(&self, request: &HttpRequest) -> Result<String> {
        let header = &self.config.identifier_header;
        let shared = self.config.missing_identifier == MissingIdentifierPolicy::SharedBucket;
        match request.header(header).map(str::trim) {
            Some(identifier)
                if shared
                    && !identifier.is_empty()
                    && identifier == self.config.fallback_identifier.trim() =>
            {
                warn!(header = %header, identifier, "Client claimed the shared fallback identifier");
                Err(CsrfError::ReservedIdentifier {
                    identifier: identifier.to_string(),
                })
            }
            Some(identifier) if !identifier.is_empty() => Ok(identifier.to_string()),
            _ => match self.config.missing_identifier {
                MissingIdentifierPolicy::Reject => Err(CsrfError::MissingIdentifier {
                    header: header.clone(),
                }),
                MissingIdentifierPolicy::SharedBucket => {
                    warn!(
                        header = %header,
                        fallback = %self.config.fallback_identifier,
                        "Identifier header absent, using shared fallback bucket"
                    );
                    Ok(self.config.fallback_identifier.clone())
                }
            },
        }
    }

    fn descriptor(&self, value: String) -> CsrfToken {
        CsrfToken::new(
            self.config.header_name.clone(),
            self.config.parameter_name.clone(),
            value,
        )
    }
}

#[async_trait]
impl<S: TokenStore + 'static> CsrfTokenRepository for StoreTokenRepository<S> {
    fn generate_token(&self, _request: &HttpRequest) -> CsrfToken {
        CsrfToken::generate(
            self.config.header_name.clone(),
            self.config.parameter_name.clone(),
        )
    }

    async fn save_token(&self, token: &CsrfToken, request: &mut HttpRequest) -> Result<()> {
        let identifier = self.resolve_identifier(request)?;

        let record = match self.store.find_by_identifier(&identifier).await? {
            Some(mut existing) => {
                existing.value = token.value.clone();
                existing
            }
            None => TokenRecord::new(identifier.clone(), token.value.clone()),
        };
        let replaced = record.is_persisted();

        let saved = self.store.save(record).await?;
        debug!(
            identifier = %identifier,
            id = ?saved.id,
            replaced,
            "Saved CSRF token"
        );

        context::inject(request, self.descriptor(saved.value));
        Ok(())
    }

    async fn load_token(&self, request: &mut HttpRequest) -> Result<Option<CsrfToken>> {
        let identifier = self.resolve_identifier(request)?;

        let Some(record) = self.store.find_by_identifier(&identifier).await? else {
            debug!(identifier = %identifier, "No CSRF token stored");
            return Ok(None);
        };

        let token = self.descriptor(record.value);
        context::inject(request, token.clone());
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestCsrfExt;
    use crate::store::MemoryTokenStore;
    use bulwark_core::HttpMethod;

    fn repository(config: CsrfConfig) -> StoreTokenRepository<MemoryTokenStore> {
        StoreTokenRepository::new(Arc::new(MemoryTokenStore::new()), config)
    }

    fn request_from(client: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::GET, "/page").with_header("x_id", client)
    }

    #[tokio::test]
    async fn test_generate_does_not_persist() {
        let repo = repository(CsrfConfig::default());
        let token = repo.generate_token(&request_from("A"));

        assert_eq!(token.header_name, "X-CSRF-TOKEN");
        assert_eq!(repo.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_injects_value() {
        let repo = repository(CsrfConfig::default());
        let mut request = request_from("A");
        let token = repo.generate_token(&request);

        repo.save_token(&token, &mut request).await.unwrap();
        assert_eq!(request.csrf_token().unwrap().value, token.value);
    }

    #[tokio::test]
    async fn test_load_absent_leaves_context_empty() {
        let repo = repository(CsrfConfig::default());
        let mut request = request_from("A");

        assert!(repo.load_token(&mut request).await.unwrap().is_none());
        assert!(request.csrf_token().is_none());
    }

    #[test]
    fn test_resolve_identifier_trims_and_rejects_blank() {
        let repo = repository(CsrfConfig::default());
        assert_eq!(repo.resolve_identifier(&request_from(" A ")).unwrap(), "A");
        assert!(matches!(
            repo.resolve_identifier(&request_from("   ")),
            Err(CsrfError::MissingIdentifier { .. })
        ));
    }

    #[test]
    fn test_resolve_identifier_header_case() {
        let repo = repository(CsrfConfig::default());
        let request = HttpRequest::new(HttpMethod::GET, "/").with_header("X_ID", "A");
        assert_eq!(repo.resolve_identifier(&request).unwrap(), "A");
    }

    #[test]
    fn test_shared_bucket_fallback() {
        let repo = repository(
            CsrfConfig::default().with_missing_identifier(MissingIdentifierPolicy::SharedBucket),
        );
        let request = HttpRequest::new(HttpMethod::GET, "/");
        assert_eq!(repo.resolve_identifier(&request).unwrap(), "anonymous");
    }

    #[test]
    fn test_shared_bucket_identifier_cannot_be_claimed() {
        let shared = repository(
            CsrfConfig::default().with_missing_identifier(MissingIdentifierPolicy::SharedBucket),
        );
        assert!(matches!(
            shared.resolve_identifier(&request_from(" anonymous ")),
            Err(CsrfError::ReservedIdentifier { ref identifier }) if identifier == "anonymous"
        ));

        // Without the shared bucket the name is an ordinary identifier
        let strict = repository(CsrfConfig::default());
        assert_eq!(strict.resolve_identifier(&request_from("anonymous")).unwrap(), "anonymous");
    }
}
