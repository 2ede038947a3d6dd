//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the caller's user UUID.
//! Handlers take an [`AuthUser`] argument; anything wrong with the header
//! or the token rejects the request with `401 UNAUTHORIZED` before the body
//! is looked at.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::ApiError;

/// JWT claims understood by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Builds a verifier from the HS256 secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Checks signature and expiry and returns the user in `sub`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for any invalid token.
    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("expired bearer token"),
                _ => tracing::debug!(error = %e, "invalid bearer token"),
            }
            ApiError::Unauthorized
        })?;
        let user = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            tracing::debug!(sub = %data.claims.sub, "bearer token subject is not a uuid");
            ApiError::Unauthorized
        })?;
        Ok(UserId::from_uuid(user))
    }

    /// Issues a token for `user_id` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }
}

/// Authenticated caller extracted from the `Authorization` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// Caller's user id.
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let user_id = state.auth.verify(token)?;
        Ok(Self { user_id })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let verifier = JwtVerifier::new("test-secret");
        let user = UserId::new();
        let Ok(token) = verifier.issue(user, Duration::minutes(5)) else {
            panic!("signing failed");
        };
        let Ok(verified) = verifier.verify(&token) else {
            panic!("token rejected");
        };
        assert_eq!(verified, user);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let user = UserId::new();
        let Ok(forged) = JwtVerifier::new("other").issue(user, Duration::minutes(5)) else {
            panic!("signing failed");
        };
        let verifier = JwtVerifier::new("test-secret");
        assert!(matches!(verifier.verify(&forged), Err(ApiError::Unauthorized)));

        let Ok(stale) = verifier.issue(user, Duration::hours(-2)) else {
            panic!("signing failed");
        };
        assert!(matches!(verifier.verify(&stale), Err(ApiError::Unauthorized)));
        assert!(matches!(verifier.verify("not-a-jwt"), Err(ApiError::Unauthorized)));
    }
}
