//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::auth;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use lingua_core::domain::{
    Activity, ActivityKind, Completion, Course, CourseSummary, Lesson, Locale, Profile, Topic,
    TopicLocation,
};
use lingua_core::ports::PortError;
use lingua_core::tracker::{self, DashboardStats};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::signin_handler,
        auth::signout_handler,
        get_config_handler,
        list_courses_handler,
        get_course_handler,
        join_waitlist_handler,
        get_profile_handler,
        update_profile_handler,
        list_completions_handler,
        complete_activity_handler,
        dashboard_stats_handler,
        next_topic_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::SigninRequest,
            auth::SignupResponse,
            auth::SigninResponse,
            auth::AuthUserResponse,
            auth::SuccessResponse,
            ConfigResponse,
            CourseSummaryResponse,
            CourseResponse,
            LessonResponse,
            TopicResponse,
            ActivityResponse,
            ProfileResponse,
            UpdateProfileRequest,
            CompletionResponse,
            DashboardStatsResponse,
            NextTopicResponse,
            WaitlistRequest,
        )
    ),
    tags(
        (name = "Lingua API", description = "Course catalog, progress tracking, and navigation for the language-learning app.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Client bootstrap values for talking to the identity provider directly.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct CourseSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl From<CourseSummary> for CourseSummaryResponse {
    fn from(course: CourseSummary) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
        }
    }
}

/// An activity with its variant payload flattened into optional fields, so
/// the client switches on `kind` and reads the matching field.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: Uuid,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_set: Option<Vec<String>>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        let (kind, video_url, embed_url, prompt_set) = match activity.kind {
            ActivityKind::Video { video_url } => ("video", Some(video_url), None, None),
            ActivityKind::Flashcards { embed_url } => ("flashcards", None, Some(embed_url), None),
            ActivityKind::AiChat { prompt_set } => ("aiChat", None, None, Some(prompt_set)),
        };
        Self {
            id: activity.id,
            kind: kind.to_string(),
            video_url,
            embed_url,
            prompt_set,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TopicResponse {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub activities: Vec<ActivityResponse>,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            title: topic.title,
            summary: topic.summary,
            activities: topic.activities.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub title: String,
    pub order: i32,
    pub topics: Vec<TopicResponse>,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title,
            order: lesson.order,
            topics: lesson.topics.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub lessons: Vec<LessonResponse>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            lessons: course.lessons.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub locale: String,
    pub current_topic_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            display_name: profile.display_name,
            locale: profile.locale.as_str().to_string(),
            current_topic_id: profile.current_topic_id,
            created_at: profile.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub locale: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

impl From<Completion> for CompletionResponse {
    fn from(completion: Completion) -> Self {
        Self {
            id: completion.id,
            user_id: completion.user_id,
            activity_id: completion.activity_id,
            completed_at: completion.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsResponse {
    pub streak: u32,
    pub completed_activities: u32,
    pub total_activities: u32,
    pub progress_percentage: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

impl From<DashboardStats> for DashboardStatsResponse {
    fn from(stats: DashboardStats) -> Self {
        Self {
            streak: stats.streak,
            completed_activities: stats.completed_activities,
            total_activities: stats.total_activities,
            progress_percentage: stats.progress_percentage,
            last_activity: stats.last_activity,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextTopicResponse {
    pub topic_id: Uuid,
    pub topic_title: String,
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub course_id: Uuid,
    pub course_title: String,
}

impl From<TopicLocation> for NextTopicResponse {
    fn from(location: TopicLocation) -> Self {
        Self {
            topic_id: location.topic_id,
            topic_title: location.topic_title,
            lesson_id: location.lesson_id,
            lesson_title: location.lesson_title,
            course_id: location.course_id,
            course_title: location.course_title,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct WaitlistRequest {
    pub email: String,
}

//=========================================================================================
// Handler Helpers
//=========================================================================================

/// Loads the caller's profile, turning a missing profile into a 401. Content
/// endpoints require a known profile, not merely a valid token.
async fn require_profile(
    state: &AppState,
    user_id: Uuid,
) -> Result<Profile, (StatusCode, String)> {
    state.db.get_profile(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => (
            StatusCode::UNAUTHORIZED,
            "No profile exists for this user".to_string(),
        ),
        other => port_error_response(other),
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /api/config - Identity provider settings for the client
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Client configuration", body = ConfigResponse)
    )
)]
pub async fn get_config_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ConfigResponse {
        supabase_url: state.config.auth_base_url.clone(),
        supabase_anon_key: state.config.auth_anon_key.clone(),
    })
}

/// GET /api/courses - List all courses
#[utoipa::path(
    get,
    path = "/api/courses",
    responses(
        (status = 200, description = "All courses", body = [CourseSummaryResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courses = state
        .db
        .list_courses()
        .await
        .map_err(port_error_response)?;

    let response: Vec<CourseSummaryResponse> = courses.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// GET /api/courses/{course_id} - A course with its full lesson/topic/activity tree
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    params(
        ("course_id" = Uuid, Path, description = "The course to fetch.")
    ),
    responses(
        (status = 200, description = "The course and its content", body = CourseResponse),
        (status = 404, description = "Course not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let course = state
        .db
        .get_course(course_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(CourseResponse::from(course)))
}

/// POST /api/waitlist - Join the launch waitlist
#[utoipa::path(
    post,
    path = "/api/waitlist",
    request_body = WaitlistRequest,
    responses(
        (status = 200, description = "Email recorded", body = auth::SuccessResponse),
        (status = 400, description = "Invalid email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn join_waitlist_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WaitlistRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            "A valid email address is required".to_string(),
        ));
    }

    state
        .db
        .add_waitlist_email(email)
        .await
        .map_err(port_error_response)?;

    Ok(Json(auth::SuccessResponse { success: true }))
}

/// GET /api/profile - The caller's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No profile exists for this user"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .db
        .get_profile(user.id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// PATCH /api/profile - Update display name and/or locale
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "The updated profile", body = ProfileResponse),
        (status = 400, description = "Unknown locale"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No profile exists for this user"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Only display name and locale are writable; everything else on the
    // profile is maintained by the server.
    let locale = match req.locale.as_deref() {
        Some(value) => Some(Locale::parse(value).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Unknown locale '{}'", value),
            )
        })?),
        None => None,
    };

    let profile = state
        .db
        .update_profile(user.id, req.display_name, locale)
        .await
        .map_err(port_error_response)?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// GET /api/completions - Every completion recorded for the caller
#[utoipa::path(
    get,
    path = "/api/completions",
    responses(
        (status = 200, description = "Completions, most recent first", body = [CompletionResponse]),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn list_completions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_profile(&state, user.id).await?;

    let completions = state
        .db
        .list_completions(user.id)
        .await
        .map_err(port_error_response)?;

    let response: Vec<CompletionResponse> = completions.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// POST /api/activities/{activity_id}/complete - Record that an activity is done
#[utoipa::path(
    post,
    path = "/api/activities/{activity_id}/complete",
    params(
        ("activity_id" = Uuid, Path, description = "The activity being completed.")
    ),
    responses(
        (status = 200, description = "The completion record (idempotent)", body = CompletionResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Activity not found"),
        (status = 409, description = "Activity was removed concurrently"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn complete_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_profile(&state, user.id).await?;

    let completion = tracker::complete_activity(state.db.as_ref(), user.id, activity_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(CompletionResponse::from(completion)))
}

/// GET /api/dashboard/stats - Streak and overall progress numbers
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatsResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn dashboard_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_profile(&state, user.id).await?;

    let stats = tracker::dashboard_stats(state.db.as_ref(), state.clock, user.id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(DashboardStatsResponse::from(stats)))
}

/// GET /api/dashboard/next-topic - Where the caller should resume
#[utoipa::path(
    get,
    path = "/api/dashboard/next-topic",
    responses(
        (status = 200, description = "The next topic to work on", body = NextTopicResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No course content exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_token" = []))
)]
pub async fn next_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = require_profile(&state, user.id).await?;

    let location = tracker::resolve_next_topic(state.db.as_ref(), &profile)
        .await
        .map_err(port_error_response)?;

    Ok(Json(NextTopicResponse::from(location)))
}
