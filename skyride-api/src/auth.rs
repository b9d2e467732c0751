use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use skyride_core::identity::IdentityResolver;
use skyride_core::{CoreError, CoreResult, Role};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Verifies HS256 customer tokens minted by the identity provider with a
/// shared secret.
pub struct JwtIdentityResolver {
    secret: String,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, bearer_token: &str) -> CoreResult<Uuid> {
        let token_data = decode::<CustomerClaims>(
            bearer_token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| CoreError::Unauthorized("Invalid or expired token".to_string()))?;

        if token_data.claims.role != Role::Customer.as_str() {
            return Err(CoreError::Unauthorized(
                "Only customers can book flights".to_string(),
            ));
        }

        Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| CoreError::Unauthorized("Token subject is not a customer id".to_string()))
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// The customer behind the request's `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct Customer(pub Uuid);

impl FromRequestParts<AppState> for Customer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // 1. Extract token from Authorization header
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| CoreError::Unauthorized("Missing bearer token".to_string()))?;

        // 2. Resolve it to a customer id
        let customer_id = state.identity.resolve(token).await?;
        Ok(Customer(customer_id))
    }
}
