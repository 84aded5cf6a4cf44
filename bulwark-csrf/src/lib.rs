//! Persisted per-client CSRF tokens for Bulwark.
//!
//! Each client, identified by a request header (`x_id` by default), owns
//! exactly one current token. The token is stored through a [`TokenStore`],
//! attached to every request's context, and must be echoed back on
//! state-changing requests.
//!
//! ## Wiring
//!
//! ```no_run
//! use bulwark_core::{Application, HttpResponse, Router};
//! use bulwark_csrf::*;
//! use std::sync::Arc;
//!
//! let config = CsrfConfig::default();
//! let store = Arc::new(MemoryTokenStore::new());
//! let repository = Arc::new(StoreTokenRepository::new(store, config.clone()));
//!
//! let router = Router::new().post("/verify", |_req| async { Ok(HttpResponse::text("ok")) });
//! let app = Application::new(router)
//!     .with_filter(CsrfFilter::new(repository, config))
//!     .with_filter(CsrfLoggingFilter);
//! ```
//!
//! ## Missing identifiers
//!
//! By default a request without the identifier header gets no token: safe
//! requests pass and unsafe requests are rejected. Set
//! [`MissingIdentifierPolicy::SharedBucket`] to put such clients in one
//! shared bucket instead.

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod logger;
pub mod repository;
pub mod store;
pub mod token;

pub use config::{CsrfConfig, MissingIdentifierPolicy};
pub use context::{CsrfRequestToken, RequestCsrfExt, inject};
pub use error::{CsrfError, Result};
pub use filter::CsrfFilter;
pub use logger::CsrfLoggingFilter;
pub use repository::{CsrfTokenRepository, StoreTokenRepository};
pub use store::{MemoryTokenStore, TokenRecord, TokenStore};
#[cfg(feature = "seaorm")]
pub use store::{DatabaseConfig, SeaOrmTokenStore};
pub use token::{CsrfToken, generate_value};
