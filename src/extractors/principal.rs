//! Extract the calling principal from trusted headers set by an upstream authenticator.

use crate::policy::Principal;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

pub const PRINCIPAL_ID_HEADER: &str = "X-Principal-Id";
pub const PRINCIPAL_ROLE_HEADER: &str = "X-Principal-Role";

/// Optional principal; absent when no `X-Principal-Id` header is sent.
#[derive(Clone, Debug, Default)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = header(&parts.headers, PRINCIPAL_ID_HEADER).map(|id| Principal {
            id,
            role: header(&parts.headers, PRINCIPAL_ROLE_HEADER),
        });
        Ok(MaybePrincipal(principal))
    }
}
