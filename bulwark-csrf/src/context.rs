//! Request-context injection.
//!
//! The resolved token travels with the request in its typed extensions, so
//! downstream filters and handlers (a form template, for instance) can read
//! it without another store round trip.

use crate::token::CsrfToken;
use bulwark_core::HttpRequest;
use std::ops::Deref;

/// The token attached to the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfRequestToken(pub CsrfToken);

impl CsrfRequestToken {
    pub fn token(&self) -> &CsrfToken {
        &self.0
    }

    /// Context attribute name (the form field name, `_csrf` by default)
    pub fn attribute_name(&self) -> &str {
        &self.0.parameter_name
    }
}

impl Deref for CsrfRequestToken {
    type Target = CsrfToken;

    fn deref(&self) -> &CsrfToken {
        &self.0
    }
}

/// Attach `token` to the request, replacing any earlier value.
pub fn inject(request: &mut HttpRequest, token: CsrfToken) {
    request.extensions.insert(CsrfRequestToken(token));
}

/// Read access to the injected token
pub trait RequestCsrfExt {
    fn csrf_token(&self) -> Option<&CsrfRequestToken>;
}

impl RequestCsrfExt for HttpRequest {
    fn csrf_token(&self) -> Option<&CsrfRequestToken> {
        self.extensions.get::<CsrfRequestToken>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::HttpMethod;

    #[test]
    fn test_inject_and_read() {
        let mut request = HttpRequest::new(HttpMethod::GET, "/page");
        assert!(request.csrf_token().is_none());

        inject(&mut request, CsrfToken::new("X-CSRF-TOKEN", "_csrf", "t1"));
        let injected = request.csrf_token().unwrap();
        assert_eq!(injected.value, "t1");
        assert_eq!(injected.attribute_name(), "_csrf");
    }

    #[test]
    fn test_latest_injection_wins() {
        let mut request = HttpRequest::new(HttpMethod::POST, "/verify");
        inject(&mut request, CsrfToken::new("X-CSRF-TOKEN", "_csrf", "old"));
        inject(&mut request, CsrfToken::new("X-CSRF-TOKEN", "_csrf", "new"));

        assert_eq!(request.csrf_token().unwrap().value, "new");
    }
}
