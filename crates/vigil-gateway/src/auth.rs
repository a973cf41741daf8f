//! Bearer-credential authentication.
//!
//! An agent authenticates with the plaintext credential it was handed at
//! registration. Only the SHA-256 digest is ever stored, so authentication
//! is hash-and-lookup; there is nothing to leak at rest.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use rand::RngCore;
use sha2::{Digest, Sha256};

use vigil_core::Agent;

use crate::error::ApiError;
use crate::state::AppState;

/// Length of a freshly generated credential, in random bytes.
const CREDENTIAL_BYTES: usize = 32;

/// Generate a new plaintext agent credential.
#[must_use]
pub fn generate_credential() -> String {
    let mut bytes = [0u8; CREDENTIAL_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest a credential for storage or lookup.
#[must_use]
pub fn hash_credential(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Check a shared-secret token header, constant shape for ingest and admin.
///
/// An unset expected token disables the surface entirely: nothing matches.
///
/// # Errors
///
/// [`ApiError::Unauthorized`] when no bearer token is present,
/// [`ApiError::Forbidden`] when it does not match.
pub fn require_token(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let presented = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    match expected {
        Some(expected) if expected == presented => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

/// The agent a valid bearer credential resolves to.
///
/// Rejections are uniform 401s; whether the credential was absent,
/// malformed, or simply unknown is not distinguishable from outside.
#[derive(Debug)]
pub struct AuthedAgent(pub Agent);

#[async_trait]
impl FromRequestParts<AppState> for AuthedAgent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let agent = state
            .agents
            .find_by_credential_hash(&hash_credential(credential))
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self(agent))
    }
}
