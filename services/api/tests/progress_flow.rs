use api_lib::adapters::MemoryStore;
use chrono::Duration;
use lingua_core::domain::{Activity, ActivityKind, Course, Lesson, Locale, Topic};
use lingua_core::ports::DatabaseService;
use lingua_core::time::{fixed_clock, fixed_now};
use lingua_core::tracker;
use uuid::Uuid;

/// One course, one lesson, one topic holding a video and a flashcard deck.
fn single_topic_course() -> (Course, Uuid, Uuid) {
    let topic_id = Uuid::new_v4();
    let video = Activity {
        id: Uuid::new_v4(),
        topic_id,
        kind: ActivityKind::Video {
            video_url: "https://videos.example/greetings".to_string(),
        },
    };
    let flashcards = Activity {
        id: Uuid::new_v4(),
        topic_id,
        kind: ActivityKind::Flashcards {
            embed_url: "https://cards.example/greetings/embed".to_string(),
        },
    };
    let video_id = video.id;
    let flashcards_id = flashcards.id;

    let course = Course {
        id: Uuid::new_v4(),
        title: "Fundamentos de Inglés 1".to_string(),
        description: "Introductory English".to_string(),
        lessons: vec![Lesson {
            id: Uuid::new_v4(),
            title: "Lección 1: Greetings and Introductions".to_string(),
            order: 1,
            topics: vec![Topic {
                id: topic_id,
                title: "Basic Greetings".to_string(),
                summary: "Hello, Hi, Good morning".to_string(),
                activities: vec![video, flashcards],
            }],
        }],
    };

    (course, video_id, flashcards_id)
}

async fn new_user(store: &MemoryStore) -> Uuid {
    let user_id = Uuid::new_v4();
    store
        .create_profile(user_id, Some("learner".to_string()), Locale::En)
        .await
        .expect("create profile");
    user_id
}

#[tokio::test]
async fn completing_twice_returns_the_same_row() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (course, video_id, _) = single_topic_course();
    store.push_course(course);
    let user_id = new_user(&store).await;

    let first = tracker::complete_activity(&store, user_id, video_id)
        .await
        .expect("first completion");
    let second = tracker::complete_activity(&store, user_id, video_id)
        .await
        .expect("repeat completion");

    assert_eq!(first.id, second.id);
    assert_eq!(first.completed_at, second.completed_at);

    let stats = tracker::dashboard_stats(&store, fixed_clock(), user_id)
        .await
        .expect("stats");
    assert_eq!(stats.completed_activities, 1);
}

#[tokio::test]
async fn dashboard_tracks_a_topic_to_full_completion() {
    let store = MemoryStore::with_clock(fixed_clock());
    let (course, video_id, flashcards_id) = single_topic_course();
    let topic_id = course.lessons[0].topics[0].id;
    store.push_course(course);
    let user_id = new_user(&store).await;

    // Half the topic done: 1 of 2, 50%, pointer untouched because the topic
    // still has incomplete work.
    tracker::complete_activity(&store, user_id, video_id)
        .await
        .expect("complete video");
    let stats = tracker::dashboard_stats(&store, fixed_clock(), user_id)
        .await
        .expect("stats after video");
    assert_eq!(stats.completed_activities, 1);
    assert_eq!(stats.total_activities, 2);
    assert_eq!(stats.progress_percentage, 50);
    assert_eq!(stats.streak, 1);
    let profile = store.get_profile(user_id).await.expect("profile");
    assert_eq!(profile.current_topic_id, None);

    // The resolver scans to the same topic and persists it as the pointer.
    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve mid-topic");
    assert_eq!(location.topic_id, topic_id);
    let profile = store.get_profile(user_id).await.expect("profile");
    assert_eq!(profile.current_topic_id, Some(topic_id));

    // Finish the topic: 100%, and with nothing ahead the pointer stays on
    // the finished topic, so navigation loops back to it.
    tracker::complete_activity(&store, user_id, flashcards_id)
        .await
        .expect("complete flashcards");
    let stats = tracker::dashboard_stats(&store, fixed_clock(), user_id)
        .await
        .expect("stats after flashcards");
    assert_eq!(stats.completed_activities, 2);
    assert_eq!(stats.total_activities, 2);
    assert_eq!(stats.progress_percentage, 100);
    assert_eq!(stats.last_activity, Some(fixed_now()));

    let profile = store.get_profile(user_id).await.expect("profile");
    let location = tracker::resolve_next_topic(&store, &profile)
        .await
        .expect("resolve after finish");
    assert_eq!(location.topic_id, topic_id);
}

#[tokio::test]
async fn streak_counts_seeded_multi_day_history() {
    let store = MemoryStore::with_clock(fixed_clock());

    // Four single-video topics so each day can complete a distinct activity.
    let mut activity_ids = Vec::new();
    let mut topics = Vec::new();
    for n in 1..=4 {
        let topic_id = Uuid::new_v4();
        let activity = Activity {
            id: Uuid::new_v4(),
            topic_id,
            kind: ActivityKind::Video {
                video_url: format!("https://videos.example/day{}", n),
            },
        };
        activity_ids.push(activity.id);
        topics.push(Topic {
            id: topic_id,
            title: format!("Topic {}", n),
            summary: String::new(),
            activities: vec![activity],
        });
    }
    store.push_course(Course {
        id: Uuid::new_v4(),
        title: "Fundamentos de Inglés 1".to_string(),
        description: "Introductory English".to_string(),
        lessons: vec![Lesson {
            id: Uuid::new_v4(),
            title: "Lección 1".to_string(),
            order: 1,
            topics,
        }],
    });
    let user_id = new_user(&store).await;

    // Today, yesterday, two days ago, then a gap before the fourth.
    let now = fixed_now();
    store.insert_completion_at(user_id, activity_ids[0], now);
    store.insert_completion_at(user_id, activity_ids[1], now - Duration::days(1));
    store.insert_completion_at(user_id, activity_ids[2], now - Duration::days(2));
    store.insert_completion_at(user_id, activity_ids[3], now - Duration::days(4));

    let stats = tracker::dashboard_stats(&store, fixed_clock(), user_id)
        .await
        .expect("stats");
    assert_eq!(stats.streak, 3);
    assert_eq!(stats.completed_activities, 4);
    assert_eq!(stats.last_activity, Some(now));
}
