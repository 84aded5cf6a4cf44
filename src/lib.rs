// Bulwark - persisted per-client CSRF tokens over a small async HTTP pipeline
//
// The core pipeline lives in `bulwark-core`, token handling in `bulwark-csrf`.
// This crate wires both into the demo application and its configuration.

// Re-export core functionality
pub use bulwark_core::*;

// Re-export the CSRF crate
pub use bulwark_csrf;

pub mod app;
pub mod config;

pub use app::{build, run};
pub use config::{AppConfig, AppError, ServerConfig};

pub mod prelude {
    pub use crate::{
        AppConfig, AppError, Application, Error, Filter, HttpMethod, HttpRequest, HttpResponse,
        Router,
    };
    pub use bulwark_csrf::{
        CsrfConfig, CsrfFilter, CsrfLoggingFilter, CsrfToken, CsrfTokenRepository,
        MemoryTokenStore, MissingIdentifierPolicy, RequestCsrfExt, StoreTokenRepository,
        TokenStore,
    };
}
