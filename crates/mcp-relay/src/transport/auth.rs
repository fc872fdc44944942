//! Credential checks for the push-capable transport.

/// Decides whether a request's credentials are acceptable.
pub trait CredentialCheck: Send + Sync {
    /// `authorization` is the raw `Authorization` header, if present.
    fn verify(&self, authorization: Option<&str>) -> bool;
}

/// Accepts every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl CredentialCheck for AllowAll {
    fn verify(&self, _authorization: Option<&str>) -> bool {
        true
    }
}

/// Requires `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialCheck for BearerToken {
    fn verify(&self, authorization: Option<&str>) -> bool {
        authorization
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == self.token)
    }
}
