//! services/api/src/bin/seed.rs
//!
//! Seeds the demo course catalog. Safe to re-run: if any course already
//! exists the catalog is left untouched.

use api_lib::{adapters::DbAdapter, config::Config, error::ApiError};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

async fn insert_course(
    pool: &PgPool,
    title: &str,
    description: &str,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO courses (title, description) VALUES ($1, $2) RETURNING id",
    )
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await
}

async fn insert_lesson(
    pool: &PgPool,
    course_id: Uuid,
    title: &str,
    order: i32,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO lessons (course_id, title, "order") VALUES ($1, $2, $3) RETURNING id"#,
    )
    .bind(course_id)
    .bind(title)
    .bind(order)
    .fetch_one(pool)
    .await
}

async fn insert_topic(
    pool: &PgPool,
    lesson_id: Uuid,
    title: &str,
    summary: &str,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO topics (lesson_id, title, summary) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(lesson_id)
    .bind(title)
    .bind(summary)
    .fetch_one(pool)
    .await
}

async fn insert_activity(
    pool: &PgPool,
    topic_id: Uuid,
    kind: &str,
    data: serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO activities (topic_id, kind, data) VALUES ($1, $2, $3)")
        .bind(topic_id)
        .bind(kind)
        .bind(data)
        .execute(pool)
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 2. Connect to Database & Run Migrations ---
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(pool.clone());
    db_adapter.run_migrations().await?;

    // --- 3. Skip if the Catalog Already Has Content ---
    let course_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
        .fetch_one(&pool)
        .await?;
    if course_count > 0 {
        info!("Catalog already contains {} course(s), nothing to do", course_count);
        return Ok(());
    }

    // --- 4. Insert the Demo Catalog ---
    // Each insert autocommits, so the created_at defaults produce distinct
    // timestamps and the traversal order matches insertion order.
    info!("Seeding the demo course catalog...");

    let course = insert_course(
        &pool,
        "Fundamentos de Inglés 1",
        "Introductory English course covering basics of greetings, introductions, and essential vocabulary",
    )
    .await?;

    let lesson1 = insert_lesson(&pool, course, "Lección 1: Greetings and Introductions", 1).await?;
    let lesson2 = insert_lesson(&pool, course, "Lección 2: Numbers and Counting", 2).await?;

    let greetings = insert_topic(
        &pool,
        lesson1,
        "Basic Greetings",
        "Learn essential greetings in English like Hello, Hi, Good morning, etc.",
    )
    .await?;
    let introductions = insert_topic(
        &pool,
        lesson1,
        "Introducing Yourself",
        "Master the phrases needed to introduce yourself: My name is..., I'm from..., etc.",
    )
    .await?;
    let numbers = insert_topic(
        &pool,
        lesson2,
        "Numbers 1-20",
        "Learn to count from 1 to 20 in English",
    )
    .await?;

    insert_activity(
        &pool,
        greetings,
        "video",
        json!({ "videoUrl": "https://www.youtube.com/watch?v=g9BERd6yRLI&t=1483s" }),
    )
    .await?;
    insert_activity(
        &pool,
        greetings,
        "flashcards",
        json!({ "embedUrl": "https://quizlet.com/123456789/flashcards/embed" }),
    )
    .await?;
    insert_activity(
        &pool,
        greetings,
        "aiChat",
        json!({
            "promptSet": [
                "Hello! How are you?",
                "Good morning! What's your name?",
                "Nice to meet you!",
            ]
        }),
    )
    .await?;

    insert_activity(
        &pool,
        introductions,
        "video",
        json!({ "videoUrl": "https://www.youtube.com/watch?v=example2" }),
    )
    .await?;
    insert_activity(
        &pool,
        introductions,
        "flashcards",
        json!({ "embedUrl": "https://quizlet.com/987654321/flashcards/embed" }),
    )
    .await?;

    insert_activity(
        &pool,
        numbers,
        "video",
        json!({ "videoUrl": "https://www.youtube.com/watch?v=example3" }),
    )
    .await?;
    insert_activity(
        &pool,
        numbers,
        "flashcards",
        json!({ "embedUrl": "https://quizlet.com/555555555/flashcards/embed" }),
    )
    .await?;

    info!("Seeded 1 course, 2 lessons, 3 topics, 7 activities");
    Ok(())
}
