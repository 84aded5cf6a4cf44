use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default header the client echoes the token in
pub const DEFAULT_HEADER_NAME: &str = "X-CSRF-TOKEN";

/// Default form field and request-context attribute name
pub const DEFAULT_PARAMETER_NAME: &str = "_csrf";

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Token descriptor handed to the pipeline
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    /// Header the token is expected in
    pub header_name: String,

    /// Form/JSON field the token is expected in
    pub parameter_name: String,

    /// Secret value
    pub value: String,
}

impl CsrfToken {
    pub fn new(
        header_name: impl Into<String>,
        parameter_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            header_name: header_name.into(),
            parameter_name: parameter_name.into(),
            value: value.into(),
        }
    }

    /// Fresh token with a random value
    pub fn generate(header_name: impl Into<String>, parameter_name: impl Into<String>) -> Self {
        Self::new(header_name, parameter_name, generate_value())
    }

    /// Compare a submitted value against this token in constant time
    pub fn matches(&self, submitted: &str) -> bool {
        constant_time_eq(&self.value, submitted)
    }

    /// Short prefix of the value, safe to log
    pub fn masked(&self) -> String {
        mask(&self.value)
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("header_name", &self.header_name)
            .field("parameter_name", &self.parameter_name)
            .field("value", &self.masked())
            .finish()
    }
}

/// 32 bytes from the thread-local CSPRNG, base64url without padding.
pub fn generate_value() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: [u8; TOKEN_BYTES] = rng.r#gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

pub(crate) fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{}...", prefix)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
