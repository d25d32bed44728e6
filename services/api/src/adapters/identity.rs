//! services/api/src/adapters/identity.rs
//!
//! This module contains the adapter for the Supabase authentication service
//! (GoTrue). It implements the `IdentityService` port from the `core` crate
//! by calling the provider's REST endpoints directly.

use async_trait::async_trait;
use lingua_core::domain::{AuthenticatedUser, IdentitySession};
use lingua_core::ports::{IdentityService, PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityService` port against Supabase.
///
/// The anon key authorizes user-scoped calls (token verification, sign-in,
/// sign-out); the service key authorizes the admin user-creation endpoint
/// used by sign-up.
#[derive(Clone)]
pub struct SupabaseIdentityAdapter {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseIdentityAdapter {
    /// Creates a new `SupabaseIdentityAdapter`.
    pub fn new(base_url: &str, anon_key: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }
}

//=========================================================================================
// Wire Payloads
//=========================================================================================

#[derive(Debug, Serialize)]
struct CredentialsPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct AdminCreateUserPayload<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
}

impl UserPayload {
    fn to_domain(self) -> AuthenticatedUser {
        AuthenticatedUser {
            id: self.id,
            email: self.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    user: UserPayload,
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for SupabaseIdentityAdapter {
    async fn verify_token(&self, token: &str) -> PortResult<AuthenticatedUser> {
        let response = self
            .client
            .get(self.endpoint("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            status if !status.is_success() => Err(PortError::Unexpected(format!(
                "Token verification failed with status {}",
                status
            ))),
            _ => {
                let user: UserPayload = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(user.to_domain())
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthenticatedUser> {
        // The admin endpoint creates the account pre-confirmed, so the user
        // can sign in immediately without an email round-trip.
        let response = self
            .client
            .post(self.endpoint("/admin/users"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&AdminCreateUserPayload {
                email,
                password,
                email_confirm: true,
            })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::UNPROCESSABLE_ENTITY => Err(PortError::Conflict(format!(
                "An account already exists for {}",
                email
            ))),
            status if !status.is_success() => Err(PortError::Unexpected(format!(
                "Sign-up failed with status {}",
                status
            ))),
            _ => {
                let user: UserPayload = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(user.to_domain())
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<IdentitySession> {
        let response = self
            .client
            .post(self.endpoint("/token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&CredentialsPayload { email, password })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            // Invalid credentials come back as a generic bad-request grant error.
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            status if !status.is_success() => Err(PortError::Unexpected(format!(
                "Sign-in failed with status {}",
                status
            ))),
            _ => {
                let token: TokenPayload = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok(IdentitySession {
                    access_token: token.access_token,
                    user: token.user.to_domain(),
                })
            }
        }
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        let response = self
            .client
            .post(self.endpoint("/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            status if !status.is_success() => Err(PortError::Unexpected(format!(
                "Sign-out failed with status {}",
                status
            ))),
            _ => Ok(()),
        }
    }
}
