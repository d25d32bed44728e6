//! crates/lingua_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The UI locale a learner has chosen for their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Es,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    /// Parses a stored/requested locale code. Unknown codes are rejected
    /// rather than defaulted so bad writes surface at the boundary.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Locale::En),
            "es" => Some(Locale::Es),
            _ => None,
        }
    }
}

/// Per-user application data keyed by the identity provider's user id.
///
/// `current_topic_id` is the resume pointer: the topic the learner should
/// land on next. It is advisory. A stale or dangling value is repaired by
/// the resolver, never surfaced as an error.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub locale: Locale,
    pub current_topic_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A catalog row for course listings, without the nested content tree.
#[derive(Debug, Clone)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

/// A course with its full content tree materialized.
///
/// Lessons arrive ordered by their `order` column; topics and activities in
/// the catalog's traversal order. The resolver depends on this ordering.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub order: i32,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub activities: Vec<Activity>,
}

/// A single learning activity inside a topic.
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub kind: ActivityKind,
}

/// The activity variants and their payloads.
///
/// A closed sum rather than a class hierarchy with a shared `completed`
/// flag: consumers are checked for exhaustiveness, and completion state
/// lives solely in the completions table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    Video { video_url: String },
    Flashcards { embed_url: String },
    AiChat { prompt_set: Vec<String> },
}

impl ActivityKind {
    /// The wire/storage tag for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Video { .. } => "video",
            ActivityKind::Flashcards { .. } => "flashcards",
            ActivityKind::AiChat { .. } => "aiChat",
        }
    }
}

/// A durable fact that a user finished an activity, stamped exactly once.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// Where a topic sits in the catalog, with enough context for the client
/// to build a navigation link without re-walking the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLocation {
    pub topic_id: Uuid,
    pub topic_title: String,
    pub lesson_id: Uuid,
    pub lesson_title: String,
    pub course_id: Uuid,
    pub course_title: String,
}

// Represents a user as resolved by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
}

// An access token plus the user it belongs to, as issued on sign-in.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub access_token: String,
    pub user: AuthenticatedUser,
}
