//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, sign-in, and sign-out. The heavy
//! lifting happens at the identity provider; these handlers glue its answers
//! to the profile store.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::state::AppState;
use lingua_core::domain::Locale;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserResponse {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user: AuthUserResponse,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub access_token: String,
    pub user: AuthUserResponse,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 409, description = "An account already exists for this email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Create the account at the identity provider
    let user = state
        .identity
        .sign_up(&req.email, &req.password)
        .await
        .map_err(port_error_response)?;

    // 2. Create the matching profile, defaulting the display name to the
    //    local part of the email
    let display_name = req.email.split('@').next().map(str::to_string);
    state
        .db
        .create_profile(user.id, display_name, Locale::En)
        .await
        .map_err(|e| {
            error!("Failed to create profile for new user: {:?}", e);
            port_error_response(e)
        })?;

    // 3. Return the created user
    let response = SignupResponse {
        user: AuthUserResponse {
            id: user.id,
            email: user.email,
        },
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/signin - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Sign-in successful", body = SigninResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(port_error_response)?;

    let response = SigninResponse {
        access_token: session.access_token,
        user: AuthUserResponse {
            id: session.user.id,
            email: session.user.email,
        },
    };
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/auth/signout - Revoke the current access token
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 200, description = "Signed out", body = SuccessResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer_token" = []))
)]
pub async fn signout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // The middleware has already verified this token; pull it back out of the
    // header to pass along to the provider's revocation endpoint.
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

    state
        .identity
        .sign_out(token)
        .await
        .map_err(port_error_response)?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
