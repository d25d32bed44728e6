//! crates/lingua_core/src/ports.rs
//!
//! Service contracts (traits) the progress logic depends on. These traits form
//! the boundary of the hexagonal architecture: the core stays independent of
//! the concrete database and identity-provider implementations behind them.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    Activity, AuthenticatedUser, Completion, Course, CourseSummary, IdentitySession, Locale,
    Profile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Profiles ---

    /// Creates the app-side profile row for a freshly signed-up user.
    async fn create_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Locale,
    ) -> PortResult<Profile>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    /// Updates the given fields; `None` leaves a field unchanged.
    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Option<Locale>,
    ) -> PortResult<Profile>;

    /// Moves the user's resume pointer. `None` clears it.
    async fn set_current_topic(&self, user_id: Uuid, topic_id: Option<Uuid>) -> PortResult<()>;

    // --- Catalog ---

    async fn list_courses(&self) -> PortResult<Vec<CourseSummary>>;

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course>;

    /// The full course tree, every level in presentation order.
    async fn load_catalog(&self) -> PortResult<Vec<Course>>;

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity>;

    // --- Completions ---

    /// Records that a user finished an activity. Idempotent: recording the
    /// same pair twice returns the original row untouched.
    async fn record_completion(&self, user_id: Uuid, activity_id: Uuid) -> PortResult<Completion>;

    /// All completions for a user, newest first.
    async fn list_completions(&self, user_id: Uuid) -> PortResult<Vec<Completion>>;

    /// Distinct calendar days (UTC) on which the user completed at least one
    /// activity, newest first.
    async fn completion_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>>;

    // --- Waitlist ---

    /// Stores a waitlist signup. Duplicate emails are accepted silently.
    async fn add_waitlist_email(&self, email: &str) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Validates an access token and returns the user it belongs to.
    async fn verify_token(&self, token: &str) -> PortResult<AuthenticatedUser>;

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthenticatedUser>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<IdentitySession>;

    async fn sign_out(&self, token: &str) -> PortResult<()>;
}
