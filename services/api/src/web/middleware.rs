//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`] for handlers to extract.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Middleware that validates the bearer token against the identity provider.
///
/// If valid, inserts an [`AuthUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Pull the token out of the "Bearer <token>" scheme
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Ask the identity provider who this token belongs to
    let user = state.identity.verify_token(token).await.map_err(|e| {
        error!("Failed to verify access token: {:?}", e);
        StatusCode::UNAUTHORIZED
    })?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(AuthUser { id: user.id });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, StaticIdentity};
    use crate::config::Config;
    use axum::{
        body::Body, http::Request, middleware::from_fn_with_state, routing::get, Extension,
        Router,
    };
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            log_level: tracing::Level::INFO,
            auth_base_url: "http://localhost".to_string(),
            auth_anon_key: "anon".to_string(),
            auth_service_key: "service".to_string(),
            cors_allowed_origin: "http://localhost:5173".to_string(),
        }
    }

    fn app_with_identity(identity: StaticIdentity) -> Router {
        let state = Arc::new(AppState {
            db: Arc::new(MemoryStore::new()),
            identity: Arc::new(identity),
            clock: lingua_core::time::fixed_clock(),
            config: Arc::new(test_config()),
        });
        Router::new()
            .route("/me", get(whoami))
            .layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        user.id.to_string()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = app_with_identity(StaticIdentity::new());

        let req = Request::get("/me").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let identity = StaticIdentity::new();
        identity.issue("secret", Uuid::new_v4(), "user@example.com");
        let app = app_with_identity(identity);

        let req = Request::get("/me")
            .header("Authorization", "Basic secret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let app = app_with_identity(StaticIdentity::new());

        let req = Request::get("/me")
            .header("Authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_user() {
        let user_id = Uuid::new_v4();
        let identity = StaticIdentity::new();
        identity.issue("secret", user_id, "user@example.com");
        let app = app_with_identity(identity);

        let req = Request::get("/me")
            .header("Authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(body, user_id.to_string().as_bytes());
    }
}
