use api_lib::adapters::MemoryStore;
use lingua_core::domain::{Activity, ActivityKind, Course, Lesson, Locale, Profile, Topic};
use lingua_core::ports::{DatabaseService, PortError};
use lingua_core::time::fixed_clock;
use lingua_core::tracker;
use uuid::Uuid;

fn video(topic_id: Uuid, url: &str) -> Activity {
    Activity {
        id: Uuid::new_v4(),
        topic_id,
        kind: ActivityKind::Video {
            video_url: url.to_string(),
        },
    }
}

/// Two courses, four single-activity topics in traversal order:
/// greetings, introductions (lesson 1), numbers (lesson 2), routines
/// (second course).
fn seed_two_courses(store: &MemoryStore) -> ([Uuid; 4], [Uuid; 4]) {
    let topic_ids = [
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
    ];
    let activities = [
        video(topic_ids[0], "https://videos.example/greetings"),
        video(topic_ids[1], "https://videos.example/introductions"),
        video(topic_ids[2], "https://videos.example/numbers"),
        video(topic_ids[3], "https://videos.example/routines"),
    ];
    let activity_ids = [
        activities[0].id,
        activities[1].id,
        activities[2].id,
        activities[3].id,
    ];
    let [greetings, introductions, numbers, routines] = activities;

    store.push_course(Course {
        id: Uuid::new_v4(),
        title: "Fundamentos de Inglés 1".to_string(),
        description: "Introductory English".to_string(),
        lessons: vec![
            Lesson {
                id: Uuid::new_v4(),
                title: "Lección 1: Greetings and Introductions".to_string(),
                order: 1,
                topics: vec![
                    Topic {
                        id: topic_ids[0],
                        title: "Basic Greetings".to_string(),
                        summary: "Hello, Hi, Good morning".to_string(),
                        activities: vec![greetings],
                    },
                    Topic {
                        id: topic_ids[1],
                        title: "Introducing Yourself".to_string(),
                        summary: "My name is...".to_string(),
                        activities: vec![introductions],
                    },
                ],
            },
            Lesson {
                id: Uuid::new_v4(),
                title: "Lección 2: Numbers and Counting".to_string(),
                order: 2,
                topics: vec![Topic {
                    id: topic_ids[2],
                    title: "Numbers 1-20".to_string(),
                    summary: "Counting".to_string(),
                    activities: vec![numbers],
                }],
            },
        ],
    });
    store.push_course(Course {
        id: Uuid::new_v4(),
        title: "Fundamentos de Inglés 2".to_string(),
        description: "Everyday English".to_string(),
        lessons: vec![Lesson {
            id: Uuid::new_v4(),
            title: "Lección 1: Daily Routines".to_string(),
            order: 1,
            topics: vec![Topic {
                id: topic_ids[3],
                title: "Morning Routines".to_string(),
                summary: "I wake up at...".to_string(),
                activities: vec![routines],
            }],
        }],
    });

    (topic_ids, activity_ids)
}

async fn new_user(store: &MemoryStore) -> Profile {
    store
        .create_profile(Uuid::new_v4(), Some("learner".to_string()), Locale::En)
        .await
        .expect("create profile")
}

#[tokio::test]
async fn fresh_user_starts_at_the_first_topic() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, _) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");

    assert_eq!(location.topic_id, topic_ids[0]);
    assert_eq!(location.topic_title, "Basic Greetings");
    assert_eq!(location.lesson_title, "Lección 1: Greetings and Introductions");
    assert_eq!(location.course_title, "Fundamentos de Inglés 1");

    // The scan result is written through to the profile.
    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_ids[0]));
}

#[tokio::test]
async fn completing_a_topic_advances_the_pointer_one_step() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, activity_ids) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    tracker::complete_activity(&store, profile.id, activity_ids[0])
        .await
        .expect("complete greetings");

    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_ids[1]));

    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");
    assert_eq!(location.topic_id, topic_ids[1]);
}

#[tokio::test]
async fn the_pointer_crosses_lesson_and_course_boundaries() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, activity_ids) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    // Finish lesson 1 entirely: the pointer lands on lesson 2's topic.
    tracker::complete_activity(&store, profile.id, activity_ids[0])
        .await
        .expect("complete greetings");
    tracker::complete_activity(&store, profile.id, activity_ids[1])
        .await
        .expect("complete introductions");
    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_ids[2]));

    // Finish the first course: the pointer crosses into the second.
    tracker::complete_activity(&store, profile.id, activity_ids[2])
        .await
        .expect("complete numbers");
    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_ids[3]));

    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");
    assert_eq!(location.topic_title, "Morning Routines");
    assert_eq!(location.course_title, "Fundamentos de Inglés 2");
}

#[tokio::test]
async fn all_complete_with_no_pointer_loops_back_to_the_start() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, activity_ids) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    // Seed the completions directly so the resume pointer stays unset.
    for activity_id in activity_ids {
        store.insert_completion_at(profile.id, activity_id, lingua_core::time::fixed_now());
    }

    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");
    assert_eq!(location.topic_id, topic_ids[0]);

    // Loop-back is not persisted; the pointer stays unset.
    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, None);
}

#[tokio::test]
async fn a_dangling_pointer_heals_itself() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, activity_ids) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    tracker::complete_activity(&store, profile.id, activity_ids[0])
        .await
        .expect("complete greetings");

    // Point the profile at a topic that no longer exists.
    store
        .set_current_topic(profile.id, Some(Uuid::new_v4()))
        .await
        .expect("set dangling pointer");

    let profile = store.get_profile(profile.id).await.expect("profile");
    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");
    assert_eq!(location.topic_id, topic_ids[1]);

    // The repaired pointer is written back.
    let profile = store.get_profile(profile.id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_ids[1]));
}

#[tokio::test]
async fn the_pointer_is_trusted_without_rescanning() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (topic_ids, activity_ids) = seed_two_courses(&store);
    let profile = new_user(&store).await;

    // The pointed-at topic is already complete and earlier topics are not,
    // yet the pointer wins: no completeness scan happens while it resolves.
    store.insert_completion_at(profile.id, activity_ids[2], lingua_core::time::fixed_now());
    store
        .set_current_topic(profile.id, Some(topic_ids[2]))
        .await
        .expect("set pointer");

    let profile = store.get_profile(profile.id).await.expect("profile");
    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve");
    assert_eq!(location.topic_id, topic_ids[2]);
    assert_eq!(location.topic_title, "Numbers 1-20");
}

#[tokio::test]
async fn an_empty_catalog_has_no_next_topic() {
    let store = MemoryStore::with_clock(fixed_clock());
    let profile = new_user(&store).await;

    let err = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect_err("no content to resolve");
    assert!(matches!(err, PortError::NotFound(_)));
}
