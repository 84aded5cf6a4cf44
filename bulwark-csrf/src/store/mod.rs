//! Token persistence.
//!
//! A [`TokenStore`] maps a client identifier to the one current token value
//! for that client. Two backends ship with the crate:
//!
//! - [`MemoryTokenStore`]: process-local, for tests and single-instance setups
//! - [`SeaOrmTokenStore`]: SQL via SeaORM (feature `seaorm`, on by default)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
#[cfg(feature = "seaorm")]
pub mod seaorm;

pub use memory::MemoryTokenStore;
#[cfg(feature = "seaorm")]
pub use seaorm::{DatabaseConfig, SeaOrmTokenStore};

/// Persisted token row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Surrogate key; `None` until the store assigns one
    pub id: Option<i32>,

    /// Client identifier, the lookup key
    pub identifier: String,

    /// Current token value
    pub value: String,
}

impl TokenRecord {
    /// Unsaved record
    pub fn new(identifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            identifier: identifier.into(),
            value: value.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Storage contract for token records.
///
/// At most one record exists per identifier. `save` on a record without an id
/// for an identifier that already has a row updates that row instead of adding
/// a second one.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Look up the record for `identifier`. Absence is `Ok(None)`.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<TokenRecord>>;

    /// Insert (no id) or update (id set) and return the persisted record.
    async fn save(&self, record: TokenRecord) -> Result<TokenRecord>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
