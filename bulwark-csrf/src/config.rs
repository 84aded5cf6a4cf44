use crate::error::{CsrfError, Result};
use crate::token::{DEFAULT_HEADER_NAME, DEFAULT_PARAMETER_NAME};
use serde::{Deserialize, Serialize};

/// Header carrying the client identifier by default
pub const DEFAULT_IDENTIFIER_HEADER: &str = "x_id";

/// Bucket used for anonymous clients under [`MissingIdentifierPolicy::SharedBucket`]
pub const DEFAULT_FALLBACK_IDENTIFIER: &str = "anonymous";

/// What to do when a request carries no client identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingIdentifierPolicy {
    /// Refuse to load or save a token. Safe requests still pass, unsafe
    /// requests are rejected.
    #[default]
    Reject,
    /// Map every anonymous client to one shared fallback identifier. Those
    /// clients can read and replace each other's token. The fallback is
    /// reserved: a request naming it explicitly is refused.
    SharedBucket,
}

impl MissingIdentifierPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "reject" => Some(Self::Reject),
            "shared_bucket" | "shared" => Some(Self::SharedBucket),
            _ => None,
        }
    }
}

/// CSRF protection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Header the client echoes the token in; also set on responses
    pub header_name: String,

    /// Form/JSON field carrying the token; also the request-context attribute name
    pub parameter_name: String,

    /// Request header identifying the client
    pub identifier_header: String,

    /// Behaviour when `identifier_header` is absent or blank
    pub missing_identifier: MissingIdentifierPolicy,

    /// Identifier used under [`MissingIdentifierPolicy::SharedBucket`].
    /// Clients may not claim it through `identifier_header` under that policy.
    pub fallback_identifier: String,

    /// Methods that bypass the token check
    pub safe_methods: Vec<String>,

    /// Path prefixes excluded from CSRF handling entirely
    pub exclude_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            parameter_name: DEFAULT_PARAMETER_NAME.to_string(),
            identifier_header: DEFAULT_IDENTIFIER_HEADER.to_string(),
            missing_identifier: MissingIdentifierPolicy::Reject,
            fallback_identifier: DEFAULT_FALLBACK_IDENTIFIER.to_string(),
            safe_methods: vec![
                "GET".to_string(),
                "HEAD".to_string(),
                "OPTIONS".to_string(),
                "TRACE".to_string(),
            ],
            exclude_paths: Vec::new(),
        }
    }
}

impl CsrfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set form field / context attribute name
    pub fn with_parameter_name(mut self, name: impl Into<String>) -> Self {
        self.parameter_name = name.into();
        self
    }

    /// Set identifier header
    pub fn with_identifier_header(mut self, name: impl Into<String>) -> Self {
        self.identifier_header = name.into();
        self
    }

    /// Set missing-identifier policy
    pub fn with_missing_identifier(mut self, policy: MissingIdentifierPolicy) -> Self {
        self.missing_identifier = policy;
        self
    }

    /// Set the shared fallback identifier
    pub fn with_fallback_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.fallback_identifier = identifier.into();
        self
    }

    pub fn with_safe_methods(mut self, methods: Vec<String>) -> Self {
        self.safe_methods = methods;
        self
    }

    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Reject configurations that cannot work at request time.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("header_name", &self.header_name),
            ("parameter_name", &self.parameter_name),
            ("identifier_header", &self.identifier_header),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CsrfError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.missing_identifier == MissingIdentifierPolicy::SharedBucket
            && self.fallback_identifier.trim().is_empty()
        {
            return Err(CsrfError::Config(
                "fallback_identifier must not be empty with the shared_bucket policy".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `method` bypasses the token check
    pub fn is_safe_method(&self, method: &str) -> bool {
        self.safe_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Whether `path` is excluded from CSRF handling
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|prefix| path.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CsrfConfig::default();
        assert_eq!(config.header_name, "X-CSRF-TOKEN");
        assert_eq!(config.parameter_name, "_csrf");
        assert_eq!(config.identifier_header, "x_id");
        assert_eq!(config.missing_identifier, MissingIdentifierPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CsrfConfig::new()
            .with_identifier_header("X-Client-Id")
            .with_missing_identifier(MissingIdentifierPolicy::SharedBucket)
            .with_fallback_identifier("guests")
            .with_exclude_paths(vec!["/hooks".to_string()]);

        assert_eq!(config.identifier_header, "X-Client-Id");
        assert_eq!(config.fallback_identifier, "guests");
        assert!(config.is_excluded("/hooks/github"));
        assert!(!config.is_excluded("/verify"));
    }

    #[test]
    fn test_validate_rejects_blank_names() {
        assert!(CsrfConfig::new().with_header_name(" ").validate().is_err());
        assert!(CsrfConfig::new().with_identifier_header("").validate().is_err());
        assert!(
            CsrfConfig::new()
                .with_missing_identifier(MissingIdentifierPolicy::SharedBucket)
                .with_fallback_identifier("")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_safe_methods() {
        let config = CsrfConfig::default();
        assert!(config.is_safe_method("get"));
        assert!(config.is_safe_method("TRACE"));
        assert!(!config.is_safe_method("POST"));
        assert!(!config.is_safe_method("DELETE"));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            MissingIdentifierPolicy::parse("shared-bucket"),
            Some(MissingIdentifierPolicy::SharedBucket)
        );
        assert_eq!(
            MissingIdentifierPolicy::parse("REJECT"),
            Some(MissingIdentifierPolicy::Reject)
        );
        assert_eq!(MissingIdentifierPolicy::parse("isolate"), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CsrfConfig =
            serde_json::from_str(r#"{"missing_identifier": "shared_bucket"}"#).unwrap();
        assert_eq!(config.missing_identifier, MissingIdentifierPolicy::SharedBucket);
        assert_eq!(config.header_name, "X-CSRF-TOKEN");
    }
}
