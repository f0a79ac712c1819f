//! # JWT identity resolver
//!
//! Verifies HS256 bearer tokens issued by the external auth service and
//! loads the caller's profile from the user store, so the role seen by the
//! Role Policy is always the current one rather than a claim in the token.

use std::sync::Arc;

use async_trait::async_trait;
use domains::{parse_id, Caller, IdentityResolver, Result, UserRepository};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserRepository>,
}

impl JwtIdentityResolver {
    pub fn new(secret: &SecretString, leeway_secs: u64, users: Arc<dyn UserRepository>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            users,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    /// Accepts a raw token or an `Authorization` header value.
    async fn resolve(&self, token: &str) -> Result<Caller> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Ok(Caller::Anonymous);
        }

        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                return Ok(Caller::Anonymous);
            }
        };
        let Ok(user_id) = parse_id("user", &claims.sub) else {
            tracing::debug!(sub = %claims.sub, "token subject is not a user id");
            return Ok(Caller::Anonymous);
        };

        match self.users.get_user(user_id).await? {
            Some(user) => Ok(Caller::Authenticated(user)),
            None => {
                tracing::debug!(%user_id, "token subject has no profile");
                Ok(Caller::Anonymous)
            }
        }
    }
}
