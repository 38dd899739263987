//! Bearer token check for administrative endpoints.

use std::collections::HashSet;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::error::ApiError;

/// Tokens allowed to call administrative endpoints.
///
/// An empty set rejects every request.
#[derive(Debug, Clone, Default)]
pub struct AdminTokens {
    tokens: HashSet<String>,
}

impl AdminTokens {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Checks the request's `Authorization: Bearer <token>` header.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthenticated("Missing bearer token".to_string()))?;

        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated("Unknown admin token".to_string()))
        }
    }
}
