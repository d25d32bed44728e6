//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, SupabaseIdentityAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{signin_handler, signout_handler, signup_handler},
        middleware::require_auth,
        rest::{
            complete_activity_handler, dashboard_stats_handler, get_config_handler,
            get_course_handler, get_profile_handler, join_waitlist_handler,
            list_completions_handler, list_courses_handler, next_topic_handler,
            update_profile_handler,
        },
        ApiDoc, AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use lingua_core::time::Clock;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Identity Adapter ---
    let identity_adapter = Arc::new(SupabaseIdentityAdapter::new(
        &config.auth_base_url,
        &config.auth_anon_key,
        &config.auth_service_key,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        identity: identity_adapter,
        clock: Clock::default_clock(),
        config: config.clone(),
    });

    // --- 5. Configure CORS ---
    let cors_origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ApiError::Internal(format!(
                "Invalid CORS_ALLOWED_ORIGIN '{}': {}",
                config.cors_allowed_origin, e
            ))
        })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/signin", post(signin_handler))
        .route("/config", get(get_config_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses/{course_id}", get(get_course_handler))
        .route("/waitlist", post(join_waitlist_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/signout", post(signout_handler))
        .route(
            "/profile",
            get(get_profile_handler).patch(update_profile_handler),
        )
        .route("/completions", get(list_completions_handler))
        .route(
            "/activities/{activity_id}/complete",
            post(complete_activity_handler),
        )
        .route("/dashboard/stats", get(dashboard_stats_handler))
        .route("/dashboard/next-topic", get(next_topic_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes under the /api prefix the client expects.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .nest("/api", api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
