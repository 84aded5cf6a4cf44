use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    /// The token store could not be reached or failed mid-operation.
    #[error("Token store unavailable: {0}")]
    StoreUnavailable(String),

    /// The client identifier header is absent and the policy is to reject.
    #[error("Missing client identifier header '{header}'")]
    MissingIdentifier { header: String },

    /// A client sent the shared fallback identifier as its own.
    #[error("Client identifier '{identifier}' is reserved")]
    ReservedIdentifier { identifier: String },

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Invalid CSRF token")]
    TokenMismatch,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

#[cfg(feature = "seaorm")]
impl From<sea_orm::DbErr> for CsrfError {
    fn from(err: sea_orm::DbErr) -> Self {
        CsrfError::StoreUnavailable(err.to_string())
    }
}

/// Fail closed: store trouble rejects the request instead of skipping the check.
impl From<CsrfError> for bulwark_core::Error {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::StoreUnavailable(_) => {
                bulwark_core::Error::ServiceUnavailable(err.to_string())
            }
            CsrfError::ReservedIdentifier { .. } => {
                bulwark_core::Error::BadRequest(err.to_string())
            }
            CsrfError::MissingIdentifier { .. }
            | CsrfError::MissingToken
            | CsrfError::TokenMismatch => bulwark_core::Error::Forbidden(err.to_string()),
            CsrfError::Config(_) => bulwark_core::Error::Internal(err.to_string()),
        }
    }
}
