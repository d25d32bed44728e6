//! services/api/src/adapters/memory.rs
//!
//! In-memory implementations of the `DatabaseService` and `IdentityService`
//! ports, used by the integration tests and handy for local prototyping
//! without a database. Behavior mirrors the Postgres adapter, including
//! idempotent completion recording and presentation-order catalogs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lingua_core::domain::{
    Activity, AuthenticatedUser, Completion, Course, CourseSummary, IdentitySession, Locale,
    Profile,
};
use lingua_core::ports::{DatabaseService, IdentityService, PortError, PortResult};
use lingua_core::time::Clock;
use uuid::Uuid;

//=========================================================================================
// In-Memory Database
//=========================================================================================

/// A `DatabaseService` over plain maps and vectors.
///
/// The catalog is seeded through [`MemoryStore::push_course`]; courses keep
/// their insertion order, so tests control presentation order directly.
#[derive(Clone)]
pub struct MemoryStore {
    clock: Clock,
    profiles: Arc<Mutex<HashMap<Uuid, Profile>>>,
    catalog: Arc<Mutex<Vec<Course>>>,
    completions: Arc<Mutex<Vec<Completion>>>,
    waitlist: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Clock::default_clock())
    }

    /// A store whose timestamps come from the given clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            profiles: Arc::new(Mutex::new(HashMap::new())),
            catalog: Arc::new(Mutex::new(Vec::new())),
            completions: Arc::new(Mutex::new(Vec::new())),
            waitlist: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends a course to the catalog.
    pub fn push_course(&self, course: Course) {
        if let Ok(mut catalog) = self.catalog.lock() {
            catalog.push(course);
        }
    }

    /// Inserts a completion with an explicit timestamp, for building
    /// multi-day histories in tests. Duplicate (user, activity) pairs are
    /// ignored like the live adapter would.
    pub fn insert_completion_at(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
        completed_at: DateTime<Utc>,
    ) {
        if let Ok(mut completions) = self.completions.lock() {
            let exists = completions
                .iter()
                .any(|c| c.user_id == user_id && c.activity_id == activity_id);
            if !exists {
                completions.push(Completion {
                    id: Uuid::new_v4(),
                    user_id,
                    activity_id,
                    completed_at,
                });
            }
        }
    }

    fn activity_in_catalog(catalog: &[Course], activity_id: Uuid) -> Option<Activity> {
        catalog
            .iter()
            .flat_map(|c| c.lessons.iter())
            .flat_map(|l| l.topics.iter())
            .flat_map(|t| t.activities.iter())
            .find(|a| a.id == activity_id)
            .cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(e.to_string())
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Locale,
    ) -> PortResult<Profile> {
        let mut profiles = self.profiles.lock().map_err(poisoned)?;
        let profile = profiles.entry(user_id).or_insert_with(|| Profile {
            id: user_id,
            display_name,
            locale,
            current_topic_id: None,
            created_at: self.clock.now(),
        });
        Ok(profile.clone())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let profiles = self.profiles.lock().map_err(poisoned)?;
        profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Option<Locale>,
    ) -> PortResult<Profile> {
        let mut profiles = self.profiles.lock().map_err(poisoned)?;
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))?;
        if let Some(display_name) = display_name {
            profile.display_name = Some(display_name);
        }
        if let Some(locale) = locale {
            profile.locale = locale;
        }
        Ok(profile.clone())
    }

    async fn set_current_topic(&self, user_id: Uuid, topic_id: Option<Uuid>) -> PortResult<()> {
        let mut profiles = self.profiles.lock().map_err(poisoned)?;
        if let Some(profile) = profiles.get_mut(&user_id) {
            profile.current_topic_id = topic_id;
        }
        Ok(())
    }

    async fn list_courses(&self) -> PortResult<Vec<CourseSummary>> {
        let catalog = self.catalog.lock().map_err(poisoned)?;
        Ok(catalog
            .iter()
            .map(|c| CourseSummary {
                id: c.id,
                title: c.title.clone(),
                description: c.description.clone(),
            })
            .collect())
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        let catalog = self.catalog.lock().map_err(poisoned)?;
        catalog
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn load_catalog(&self) -> PortResult<Vec<Course>> {
        let catalog = self.catalog.lock().map_err(poisoned)?;
        Ok(catalog.clone())
    }

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity> {
        let catalog = self.catalog.lock().map_err(poisoned)?;
        Self::activity_in_catalog(&catalog, activity_id)
            .ok_or_else(|| PortError::NotFound(format!("Activity {} not found", activity_id)))
    }

    async fn record_completion(&self, user_id: Uuid, activity_id: Uuid) -> PortResult<Completion> {
        // The live adapter's foreign key rejects completions for activities
        // that vanished; mirror that here.
        {
            let catalog = self.catalog.lock().map_err(poisoned)?;
            if Self::activity_in_catalog(&catalog, activity_id).is_none() {
                return Err(PortError::Conflict(format!(
                    "Activity {} no longer exists",
                    activity_id
                )));
            }
        }

        let mut completions = self.completions.lock().map_err(poisoned)?;
        if let Some(existing) = completions
            .iter()
            .find(|c| c.user_id == user_id && c.activity_id == activity_id)
        {
            return Ok(existing.clone());
        }

        let completion = Completion {
            id: Uuid::new_v4(),
            user_id,
            activity_id,
            completed_at: self.clock.now(),
        };
        completions.push(completion.clone());
        Ok(completion)
    }

    async fn list_completions(&self, user_id: Uuid) -> PortResult<Vec<Completion>> {
        let completions = self.completions.lock().map_err(poisoned)?;
        let mut mine: Vec<Completion> = completions
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(mine)
    }

    async fn completion_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        let completions = self.completions.lock().map_err(poisoned)?;
        let mut days: Vec<NaiveDate> = completions
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.completed_at.date_naive())
            .collect();
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.dedup();
        Ok(days)
    }

    async fn add_waitlist_email(&self, email: &str) -> PortResult<()> {
        let mut waitlist = self.waitlist.lock().map_err(poisoned)?;
        if !waitlist.iter().any(|e| e == email) {
            waitlist.push(email.to_string());
        }
        Ok(())
    }
}

//=========================================================================================
// In-Memory Identity Provider
//=========================================================================================

/// An `IdentityService` backed by a token table, for tests.
#[derive(Clone, Default)]
pub struct StaticIdentity {
    tokens: Arc<Mutex<HashMap<String, AuthenticatedUser>>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token as valid for the given user.
    pub fn issue(&self, token: &str, user_id: Uuid, email: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(
                token.to_string(),
                AuthenticatedUser {
                    id: user_id,
                    email: Some(email.to_string()),
                },
            );
        }
    }
}

#[async_trait]
impl IdentityService for StaticIdentity {
    async fn verify_token(&self, token: &str) -> PortResult<AuthenticatedUser> {
        let tokens = self.tokens.lock().map_err(poisoned)?;
        tokens.get(token).cloned().ok_or(PortError::Unauthorized)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> PortResult<AuthenticatedUser> {
        let user = AuthenticatedUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        let mut tokens = self.tokens.lock().map_err(poisoned)?;
        tokens.insert(format!("token-{}", user.id), user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, _password: &str) -> PortResult<IdentitySession> {
        let tokens = self.tokens.lock().map_err(poisoned)?;
        let (token, user) = tokens
            .iter()
            .find(|(_, user)| user.email.as_deref() == Some(email))
            .ok_or(PortError::Unauthorized)?;
        Ok(IdentitySession {
            access_token: token.clone(),
            user: user.clone(),
        })
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        let mut tokens = self.tokens.lock().map_err(poisoned)?;
        tokens.remove(token);
        Ok(())
    }
}
