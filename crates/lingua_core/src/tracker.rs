//! crates/lingua_core/src/tracker.rs
//!
//! Orchestrates progress tracking against the database port: recording
//! completions, advancing the resume pointer, resolving the next topic, and
//! assembling dashboard statistics. The date and tree arithmetic itself lives
//! in the `progress` module.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Completion, Profile, TopicLocation};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::progress;
use crate::time::Clock;

//=========================================================================================
// Next-Topic Resolution
//=========================================================================================

/// Resolves the topic the user should work on next.
///
/// The resume pointer on the profile is trusted as long as it still resolves
/// to a real topic; a missing or dangling pointer triggers a full scan for the
/// first topic with incomplete work, and the scan result is written back to
/// the profile. When everything is complete the resolver loops back to the
/// very first topic. Fails with `NotFound` only when the catalog has no
/// topics at all.
pub async fn resolve_next_topic(
    db: &dyn DatabaseService,
    profile: &Profile,
) -> PortResult<TopicLocation> {
    let catalog = db.load_catalog().await?;

    // 1. Trust the resume pointer if it still points at a real topic.
    if let Some(topic_id) = profile.current_topic_id {
        if let Some(location) = progress::locate_topic(&catalog, topic_id) {
            return Ok(location);
        }
    }

    // 2. Pointer unset or dangling: scan for the first incomplete topic.
    let done = completed_set(db, profile.id).await?;
    if let Some(location) = progress::first_incomplete_topic(&catalog, &done) {
        // 3. Write the scan result through to the profile so the next call
        //    skips the scan.
        db.set_current_topic(profile.id, Some(location.topic_id))
            .await?;
        return Ok(location);
    }

    // 4. Everything is complete: loop back to the start. The pointer is left
    //    alone so a later call still notices newly added content.
    progress::first_topic(&catalog)
        .ok_or_else(|| PortError::NotFound("No course content is available".to_string()))
}

//=========================================================================================
// Completion Recording
//=========================================================================================

/// Records an activity completion and advances the resume pointer when the
/// containing topic is finished.
///
/// Recording is idempotent: repeat calls return the original completion row.
/// The pointer only moves once the activity's topic has no incomplete work
/// left; it then lands on the next incomplete topic, or stays on the finished
/// topic when nothing lies ahead.
pub async fn complete_activity(
    db: &dyn DatabaseService,
    user_id: Uuid,
    activity_id: Uuid,
) -> PortResult<Completion> {
    // 1. Referential check before writing, so an unknown id is a clean
    //    NotFound rather than a storage error.
    let activity = db.get_activity(activity_id).await?;

    // 2. Record the completion (or fetch the existing row).
    let completion = db.record_completion(user_id, activity_id).await?;

    // 3. Re-test the containing topic and advance the pointer if it is done.
    let catalog = db.load_catalog().await?;
    let done = completed_set(db, user_id).await?;
    if let Some(topic) = progress::find_topic(&catalog, activity.topic_id) {
        if progress::topic_is_complete(topic, &done) {
            let next = progress::next_incomplete_after(&catalog, &done, topic.id)
                .map(|location| location.topic_id)
                .unwrap_or(topic.id);
            db.set_current_topic(user_id, Some(next)).await?;
        }
    }

    Ok(completion)
}

//=========================================================================================
// Dashboard Statistics
//=========================================================================================

/// Aggregate progress numbers for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub streak: u32,
    pub completed_activities: u32,
    pub total_activities: u32,
    pub progress_percentage: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Computes streak, catalog-wide completion counts, and the timestamp of the
/// most recent completion.
pub async fn dashboard_stats(
    db: &dyn DatabaseService,
    clock: Clock,
    user_id: Uuid,
) -> PortResult<DashboardStats> {
    let catalog = db.load_catalog().await?;
    let completions = db.list_completions(user_id).await?;
    let dates = db.completion_dates(user_id).await?;

    let done: HashSet<Uuid> = completions.iter().map(|c| c.activity_id).collect();
    let totals = progress::catalog_totals(&catalog, &done);

    Ok(DashboardStats {
        streak: progress::current_streak(&dates, clock.today()),
        completed_activities: totals.completed,
        total_activities: totals.total,
        progress_percentage: totals.percentage(),
        // list_completions returns newest first.
        last_activity: completions.first().map(|c| c.completed_at),
    })
}

async fn completed_set(db: &dyn DatabaseService, user_id: Uuid) -> PortResult<HashSet<Uuid>> {
    let completions = db.list_completions(user_id).await?;
    Ok(completions.iter().map(|c| c.activity_id).collect())
}
