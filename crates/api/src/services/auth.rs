//! Bearer token verification.
//!
//! Tokens are HS256 JWTs signed by the authentication service with the
//! shared secret from `API_JWT_SECRET`. They carry `userId` and `email`.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use tindahan_core::UserId;

use crate::models::CurrentUser;

/// Scheme prefix required on the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Number of token characters included in log lines.
const TOKEN_EXCERPT_LEN: usize = 10;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(
        rename = "userId",
        alias = "user_id",
        deserialize_with = "deserialize_user_id"
    )]
    pub user_id: UserId,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Claims for `user_id` valid for `ttl` from now.
    #[must_use]
    pub fn new(user_id: UserId, email: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email: email.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Accept the user id as a JSON number or as a string holding one.
fn deserialize_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Number(i32),
        Text(String),
    }

    match RawUserId::deserialize(deserializer)? {
        RawUserId::Number(id) => Ok(UserId::new(id)),
        RawUserId::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

/// Sign claims with the shared secret.
///
/// Used by the CLI and tests; production tokens come from the auth service.
///
/// # Errors
///
/// Returns a `jsonwebtoken` error if encoding fails.
pub fn issue_token(
    secret: &SecretString,
    claims: &Claims,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
}

/// Verifies bearer credentials against the shared secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for HS256 tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Resolve the caller identity from a raw `Authorization` header value.
    ///
    /// Returns `None` when the header is absent, is not a bearer credential,
    /// or fails signature/expiry checks. Never errors.
    #[must_use]
    pub fn verify(&self, authorization: Option<&str>) -> Option<CurrentUser> {
        let Some(header) = authorization else {
            tracing::debug!("no authorization header");
            return None;
        };

        let Some(token) = header.strip_prefix(BEARER_PREFIX) else {
            tracing::debug!("authorization header is not a bearer credential");
            return None;
        };
        let token = token.trim();

        tracing::debug!(token = %excerpt(token), "verifying bearer token");

        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(CurrentUser {
                id: data.claims.user_id,
                email: data.claims.email,
            }),
            Err(e) => {
                tracing::warn!(token = %excerpt(token), error = %e, "bearer token rejected");
                None
            }
        }
    }
}

/// First few characters of a token, for logs.
fn excerpt(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_EXCERPT_LEN).collect();
    format!("{head}...")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("Zq7!mR2#vL9@tB4$wK8^nP3&xC6*hF1d")
    }

    fn bearer(claims: &Claims) -> String {
        format!("Bearer {}", issue_token(&secret(), claims).unwrap())
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let verifier = TokenVerifier::new(&secret());
        let header = bearer(&Claims::new(UserId::new(7), "a@b.com", Duration::hours(1)));

        let user = verifier.verify(Some(&header)).unwrap();
        assert_eq!(user.id, UserId::new(7));
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn test_missing_header_rejected() {
        let verifier = TokenVerifier::new(&secret());
        assert!(verifier.verify(None).is_none());
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let verifier = TokenVerifier::new(&secret());
        let token = issue_token(
            &secret(),
            &Claims::new(UserId::new(7), "a@b.com", Duration::hours(1)),
        )
        .unwrap();

        assert!(verifier.verify(Some(&token)).is_none());
        assert!(verifier.verify(Some(&format!("Basic {token}"))).is_none());
        assert!(verifier.verify(Some(&format!("bearer {token}"))).is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new(&secret());
        let header = bearer(&Claims::new(UserId::new(7), "a@b.com", -Duration::hours(2)));
        assert!(verifier.verify(Some(&header)).is_none());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let verifier = TokenVerifier::new(&secret());
        let other = SecretString::from("Hn4^pW8!cX2@rJ6#yT1$mV5&kB9*sD3q");
        let token = issue_token(
            &other,
            &Claims::new(UserId::new(7), "a@b.com", Duration::hours(1)),
        )
        .unwrap();
        assert!(verifier.verify(Some(&format!("Bearer {token}"))).is_none());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let verifier = TokenVerifier::new(&secret());
        assert!(verifier.verify(Some("Bearer not.a.jwt")).is_none());
        assert!(verifier.verify(Some("Bearer ")).is_none());
    }

    #[test]
    fn test_string_user_id_claim_accepted() {
        let verifier = TokenVerifier::new(&secret());
        let claims = serde_json::json!({
            "userId": "42",
            "email": "s@t.ph",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
            "iat": Utc::now().timestamp(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret().expose_secret().as_bytes()),
        )
        .unwrap();

        let user = verifier.verify(Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(user.id, UserId::new(42));
    }

    #[test]
    fn test_excerpt_truncates() {
        assert_eq!(excerpt("abcdefghijklmnop"), "abcdefghij...");
        assert_eq!(excerpt("abc"), "abc...");
    }
}
