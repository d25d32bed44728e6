//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use lingua_core::domain::{
    Activity, ActivityKind, Completion, Course, CourseSummary, Lesson, Locale, Profile, Topic,
};
use lingua_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the consolidated schema migration at startup. Re-running is a
    /// no-op thanks to the version table.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version BIGINT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&self.pool)
        .await?;

        let applied = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = $1")
            .bind(1_i64)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if applied {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS profiles (
                id UUID PRIMARY KEY,
                display_name TEXT,
                locale TEXT NOT NULL DEFAULT 'en',
                current_topic_id UUID,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS courses (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lessons (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                "order" INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS topics (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                lesson_id UUID NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS activities (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                topic_id UUID NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS activity_completions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                activity_id UUID NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                completed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, activity_id)
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS waitlist_emails (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_lessons_course_order
                ON lessons (course_id, "order");
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_topics_lesson
                ON topics (lesson_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_activities_topic
                ON activities (topic_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_completions_user_completed
                ON activity_completions (user_id, completed_at DESC);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1) ON CONFLICT (version) DO NOTHING")
            .bind(1_i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Loads fully materialized course trees, optionally restricted to one
    /// course. One query per level instead of a walk per node.
    async fn load_courses(&self, course_id: Option<Uuid>) -> PortResult<Vec<Course>> {
        let course_rows: Vec<CourseRecord> = match course_id {
            Some(id) => {
                sqlx::query_as(
                    "SELECT id, title, description FROM courses WHERE id = $1",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT id, title, description FROM courses ORDER BY created_at, id",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if course_rows.is_empty() {
            return Ok(Vec::new());
        }

        let course_ids: Vec<Uuid> = course_rows.iter().map(|c| c.id).collect();
        let lesson_rows: Vec<LessonRecord> = sqlx::query_as(
            r#"SELECT id, course_id, title, "order" FROM lessons
               WHERE course_id = ANY($1) ORDER BY "order", created_at, id"#,
        )
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let lesson_ids: Vec<Uuid> = lesson_rows.iter().map(|l| l.id).collect();
        let topic_rows: Vec<TopicRecord> = sqlx::query_as(
            "SELECT id, lesson_id, title, summary FROM topics
             WHERE lesson_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(lesson_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let topic_ids: Vec<Uuid> = topic_rows.iter().map(|t| t.id).collect();
        let activity_rows: Vec<ActivityRecord> = sqlx::query_as(
            "SELECT id, topic_id, kind, data FROM activities
             WHERE topic_id = ANY($1)
             ORDER BY CASE kind
                 WHEN 'video' THEN 1
                 WHEN 'flashcards' THEN 2
                 WHEN 'aiChat' THEN 3
                 ELSE 4
             END, created_at",
        )
        .bind(topic_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Group children under their parents; the per-parent order of each
        // Vec follows the query ordering above.
        let mut activities_by_topic: HashMap<Uuid, Vec<Activity>> = HashMap::new();
        for row in activity_rows {
            let topic_id = row.topic_id;
            activities_by_topic
                .entry(topic_id)
                .or_default()
                .push(row.to_domain()?);
        }

        let mut topics_by_lesson: HashMap<Uuid, Vec<Topic>> = HashMap::new();
        for row in topic_rows {
            let activities = activities_by_topic.remove(&row.id).unwrap_or_default();
            topics_by_lesson.entry(row.lesson_id).or_default().push(Topic {
                id: row.id,
                title: row.title,
                summary: row.summary,
                activities,
            });
        }

        let mut lessons_by_course: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
        for row in lesson_rows {
            let topics = topics_by_lesson.remove(&row.id).unwrap_or_default();
            lessons_by_course.entry(row.course_id).or_default().push(Lesson {
                id: row.id,
                title: row.title,
                order: row.order,
                topics,
            });
        }

        let courses = course_rows
            .into_iter()
            .map(|row| Course {
                id: row.id,
                title: row.title,
                description: row.description,
                lessons: lessons_by_course.remove(&row.id).unwrap_or_default(),
            })
            .collect();
        Ok(courses)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    display_name: Option<String>,
    locale: String,
    current_topic_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<Profile> {
        let locale = Locale::parse(&self.locale).ok_or_else(|| {
            PortError::Unexpected(format!(
                "Profile {} has unknown locale {}",
                self.id, self.locale
            ))
        })?;
        Ok(Profile {
            id: self.id,
            display_name: self.display_name,
            locale,
            current_topic_id: self.current_topic_id,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
}
impl CourseRecord {
    fn to_summary(self) -> CourseSummary {
        CourseSummary {
            id: self.id,
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order: i32,
}

#[derive(FromRow)]
struct TopicRecord {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    summary: String,
}

#[derive(FromRow)]
struct ActivityRecord {
    id: Uuid,
    topic_id: Uuid,
    kind: String,
    data: serde_json::Value,
}
impl ActivityRecord {
    fn to_domain(self) -> PortResult<Activity> {
        let kind = match self.kind.as_str() {
            "video" => ActivityKind::Video {
                video_url: payload_str(&self.data, "videoUrl", self.id)?,
            },
            "flashcards" => ActivityKind::Flashcards {
                embed_url: payload_str(&self.data, "embedUrl", self.id)?,
            },
            "aiChat" => ActivityKind::AiChat {
                prompt_set: payload_prompts(&self.data, self.id)?,
            },
            other => {
                return Err(PortError::Unexpected(format!(
                    "Activity {} has unknown kind {}",
                    self.id, other
                )))
            }
        };
        Ok(Activity {
            id: self.id,
            topic_id: self.topic_id,
            kind,
        })
    }
}

fn payload_str(data: &serde_json::Value, key: &str, activity_id: Uuid) -> PortResult<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            PortError::Unexpected(format!(
                "Activity {} is missing payload field {}",
                activity_id, key
            ))
        })
}

fn payload_prompts(data: &serde_json::Value, activity_id: Uuid) -> PortResult<Vec<String>> {
    let items = data
        .get("promptSet")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            PortError::Unexpected(format!(
                "Activity {} is missing payload field promptSet",
                activity_id
            ))
        })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                PortError::Unexpected(format!(
                    "Activity {} has a non-string prompt",
                    activity_id
                ))
            })
        })
        .collect()
}

#[derive(FromRow)]
struct CompletionRecord {
    id: Uuid,
    user_id: Uuid,
    activity_id: Uuid,
    completed_at: chrono::DateTime<chrono::Utc>,
}
impl CompletionRecord {
    fn to_domain(self) -> Completion {
        Completion {
            id: self.id,
            user_id: self.user_id,
            activity_id: self.activity_id,
            completed_at: self.completed_at,
        }
    }
}

#[derive(FromRow)]
struct DateRecord {
    day: NaiveDate,
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Locale,
    ) -> PortResult<Profile> {
        sqlx::query(
            "INSERT INTO profiles (id, display_name, locale) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id)
        .bind(&display_name)
        .bind(locale.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let record: ProfileRecord = sqlx::query_as(
            "SELECT id, display_name, locale, current_topic_id, created_at
             FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record: ProfileRecord = sqlx::query_as(
            "SELECT id, display_name, locale, current_topic_id, created_at
             FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Profile {} not found", user_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
        locale: Option<Locale>,
    ) -> PortResult<Profile> {
        let record: Option<ProfileRecord> = sqlx::query_as(
            "UPDATE profiles
             SET display_name = COALESCE($2, display_name),
                 locale = COALESCE($3, locale)
             WHERE id = $1
             RETURNING id, display_name, locale, current_topic_id, created_at",
        )
        .bind(user_id)
        .bind(&display_name)
        .bind(locale.map(|l| l.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::NotFound(format!(
                "Profile {} not found",
                user_id
            ))),
        }
    }

    async fn set_current_topic(&self, user_id: Uuid, topic_id: Option<Uuid>) -> PortResult<()> {
        sqlx::query("UPDATE profiles SET current_topic_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn list_courses(&self) -> PortResult<Vec<CourseSummary>> {
        let records: Vec<CourseRecord> = sqlx::query_as(
            "SELECT id, title, description FROM courses ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_summary()).collect())
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.load_courses(Some(course_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn load_catalog(&self) -> PortResult<Vec<Course>> {
        self.load_courses(None).await
    }

    async fn get_activity(&self, activity_id: Uuid) -> PortResult<Activity> {
        let record: ActivityRecord = sqlx::query_as(
            "SELECT id, topic_id, kind, data FROM activities WHERE id = $1",
        )
        .bind(activity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Activity {} not found", activity_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.to_domain()
    }

    async fn record_completion(&self, user_id: Uuid, activity_id: Uuid) -> PortResult<Completion> {
        // Insert-or-keep, then read back, so a duplicate request observes the
        // original row. A foreign-key violation means the activity vanished
        // between the caller's existence check and this insert.
        sqlx::query(
            "INSERT INTO activity_completions (user_id, activity_id) VALUES ($1, $2)
             ON CONFLICT (user_id, activity_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(activity_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => PortError::Conflict(format!(
                "Activity {} no longer exists",
                activity_id
            )),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        let record: CompletionRecord = sqlx::query_as(
            "SELECT id, user_id, activity_id, completed_at
             FROM activity_completions WHERE user_id = $1 AND activity_id = $2",
        )
        .bind(user_id)
        .bind(activity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn list_completions(&self, user_id: Uuid) -> PortResult<Vec<Completion>> {
        let records: Vec<CompletionRecord> = sqlx::query_as(
            "SELECT id, user_id, activity_id, completed_at
             FROM activity_completions WHERE user_id = $1
             ORDER BY completed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn completion_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        let records: Vec<DateRecord> = sqlx::query_as(
            "SELECT DISTINCT (completed_at AT TIME ZONE 'UTC')::date AS day
             FROM activity_completions WHERE user_id = $1
             ORDER BY day DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.day).collect())
    }

    async fn add_waitlist_email(&self, email: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO waitlist_emails (email) VALUES ($1) ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
