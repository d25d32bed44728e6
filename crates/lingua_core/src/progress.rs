//! crates/lingua_core/src/progress.rs
//!
//! Pure progress arithmetic: streak counting, topic completion checks, and
//! ordered traversal of the course tree. Nothing here touches a port; the
//! tracker module feeds these functions with data it loaded through
//! `DatabaseService`.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use crate::domain::{Course, Lesson, Topic, TopicLocation};

//=========================================================================================
// Streaks
//=========================================================================================

/// Counts consecutive calendar days with activity, ending today.
///
/// `days` is the set of distinct days on which the user completed at least one
/// activity. The streak is the run `today, today-1, today-2, ...` that the set
/// covers without a gap; a user who did nothing today has a streak of zero
/// even if yesterday was active.
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    // Callers pass distinct days sorted newest-first, but sorting again here
    // keeps the result correct for arbitrary input.
    let mut days = days.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut streak = 0u32;
    for (i, day) in days.iter().enumerate() {
        let expected = match today.checked_sub_days(Days::new(i as u64)) {
            Some(d) => d,
            None => break,
        };
        if *day != expected {
            break;
        }
        streak += 1;
    }
    streak
}

//=========================================================================================
// Completion checks
//=========================================================================================

/// A topic counts as complete only when it has activities and every one of
/// them appears in `done`. A topic with no activities is never complete, so
/// content added to it later still gets surfaced.
pub fn topic_is_complete(topic: &Topic, done: &HashSet<Uuid>) -> bool {
    !topic.activities.is_empty() && topic.activities.iter().all(|a| done.contains(&a.id))
}

/// Completed-vs-total counts across the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTotals {
    pub completed: u32,
    pub total: u32,
}

impl ProgressTotals {
    /// Whole-number percentage, rounded half away from zero. Zero when the
    /// catalog has no activities at all.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((f64::from(self.completed) / f64::from(self.total)) * 100.0).round() as u32
    }
}

/// Tallies every activity in the catalog against the user's done-set.
/// Completions that reference activities no longer in the catalog do not
/// count; the numbers always describe what the user can see.
pub fn catalog_totals(catalog: &[Course], done: &HashSet<Uuid>) -> ProgressTotals {
    let mut totals = ProgressTotals {
        completed: 0,
        total: 0,
    };
    for topic in topics_in_order(catalog).map(|(_, _, t)| t) {
        for activity in &topic.activities {
            totals.total += 1;
            if done.contains(&activity.id) {
                totals.completed += 1;
            }
        }
    }
    totals
}

//=========================================================================================
// Catalog traversal
//=========================================================================================

/// Walks topics in presentation order: courses as stored, lessons by their
/// `order` column, topics as stored within each lesson.
fn topics_in_order(catalog: &[Course]) -> impl Iterator<Item = (&Course, &Lesson, &Topic)> {
    catalog.iter().flat_map(|course| {
        course.lessons.iter().flat_map(move |lesson| {
            lesson
                .topics
                .iter()
                .map(move |topic| (course, lesson, topic))
        })
    })
}

fn location(course: &Course, lesson: &Lesson, topic: &Topic) -> TopicLocation {
    TopicLocation {
        topic_id: topic.id,
        topic_title: topic.title.clone(),
        lesson_id: lesson.id,
        lesson_title: lesson.title.clone(),
        course_id: course.id,
        course_title: course.title.clone(),
    }
}

/// Looks a topic up anywhere in the catalog.
pub fn find_topic(catalog: &[Course], topic_id: Uuid) -> Option<&Topic> {
    topics_in_order(catalog)
        .map(|(_, _, t)| t)
        .find(|t| t.id == topic_id)
}

/// Like [`find_topic`] but returns the topic together with its lesson and
/// course context.
pub fn locate_topic(catalog: &[Course], topic_id: Uuid) -> Option<TopicLocation> {
    topics_in_order(catalog)
        .find(|(_, _, t)| t.id == topic_id)
        .map(|(c, l, t)| location(c, l, t))
}

/// The very first topic in the catalog, if any content exists.
pub fn first_topic(catalog: &[Course]) -> Option<TopicLocation> {
    topics_in_order(catalog)
        .next()
        .map(|(c, l, t)| location(c, l, t))
}

/// The first topic, in presentation order, that the user has not finished.
pub fn first_incomplete_topic(
    catalog: &[Course],
    done: &HashSet<Uuid>,
) -> Option<TopicLocation> {
    topics_in_order(catalog)
        .find(|(_, _, t)| !topic_is_complete(t, done))
        .map(|(c, l, t)| location(c, l, t))
}

/// The first incomplete topic strictly after `after_topic_id` in presentation
/// order. Returns `None` when the anchor is missing from the catalog or
/// nothing incomplete follows it.
pub fn next_incomplete_after(
    catalog: &[Course],
    done: &HashSet<Uuid>,
    after_topic_id: Uuid,
) -> Option<TopicLocation> {
    let mut past_anchor = false;
    for (course, lesson, topic) in topics_in_order(catalog) {
        if past_anchor && !topic_is_complete(topic, done) {
            return Some(location(course, lesson, topic));
        }
        if topic.id == after_topic_id {
            past_anchor = true;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Activity, ActivityKind, Course, Lesson, Topic};

    fn sample_activity(topic_id: Uuid) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            topic_id,
            kind: ActivityKind::Video {
                video_url: "https://example.com/clip".to_string(),
            },
        }
    }

    fn sample_topic(title: &str, activity_count: usize) -> Topic {
        let id = Uuid::new_v4();
        Topic {
            id,
            title: title.to_string(),
            summary: format!("{title} summary"),
            activities: (0..activity_count).map(|_| sample_activity(id)).collect(),
        }
    }

    fn sample_course(title: &str, lessons: Vec<Lesson>) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            lessons,
        }
    }

    fn sample_lesson(title: &str, order: i32, topics: Vec<Topic>) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            title: title.to_string(),
            order,
            topics,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let today = date(2024, 3, 10);
        let days = vec![date(2024, 3, 10), date(2024, 3, 9), date(2024, 3, 8)];
        assert_eq!(current_streak(&days, today), 3);
    }

    #[test]
    fn streak_is_zero_without_activity_today() {
        let today = date(2024, 3, 10);
        let days = vec![date(2024, 3, 5)];
        assert_eq!(current_streak(&days, today), 0);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let today = date(2024, 3, 10);
        let days = vec![date(2024, 3, 10), date(2024, 3, 9), date(2024, 3, 7)];
        assert_eq!(current_streak(&days, today), 2);
    }

    #[test]
    fn streak_ignores_duplicate_days() {
        let today = date(2024, 3, 10);
        let days = vec![today; 5];
        assert_eq!(current_streak(&days, today), 1);
    }

    #[test]
    fn streak_handles_unsorted_input() {
        let today = date(2024, 3, 10);
        let days = vec![date(2024, 3, 8), date(2024, 3, 10), date(2024, 3, 9)];
        assert_eq!(current_streak(&days, today), 3);
    }

    #[test]
    fn streak_of_empty_history_is_zero() {
        assert_eq!(current_streak(&[], date(2024, 3, 10)), 0);
    }

    #[test]
    fn streak_spans_month_boundaries() {
        let today = date(2024, 3, 1);
        let days = vec![date(2024, 3, 1), date(2024, 2, 29), date(2024, 2, 28)];
        assert_eq!(current_streak(&days, today), 3);
    }

    #[test]
    fn topic_with_no_activities_is_never_complete() {
        let topic = sample_topic("Empty", 0);
        assert!(!topic_is_complete(&topic, &HashSet::new()));
    }

    #[test]
    fn topic_completion_requires_every_activity() {
        let topic = sample_topic("Greetings", 2);
        let mut done = HashSet::new();
        done.insert(topic.activities[0].id);
        assert!(!topic_is_complete(&topic, &done));

        done.insert(topic.activities[1].id);
        assert!(topic_is_complete(&topic, &done));
    }

    #[test]
    fn first_incomplete_skips_finished_topics() {
        let t1 = sample_topic("T1", 1);
        let t2 = sample_topic("T2", 1);
        let done: HashSet<Uuid> = t1.activities.iter().map(|a| a.id).collect();
        let t2_id = t2.id;
        let catalog = vec![sample_course(
            "A",
            vec![sample_lesson("L1", 1, vec![t1, t2])],
        )];

        let hit = first_incomplete_topic(&catalog, &done).unwrap();
        assert_eq!(hit.topic_id, t2_id);
        assert_eq!(hit.lesson_title, "L1");
        assert_eq!(hit.course_title, "A");
    }

    #[test]
    fn first_incomplete_surfaces_empty_topics() {
        let t1 = sample_topic("Full", 1);
        let t2 = sample_topic("Placeholder", 0);
        let done: HashSet<Uuid> = t1.activities.iter().map(|a| a.id).collect();
        let t2_id = t2.id;
        let catalog = vec![sample_course(
            "A",
            vec![sample_lesson("L1", 1, vec![t1, t2])],
        )];

        let hit = first_incomplete_topic(&catalog, &done).unwrap();
        assert_eq!(hit.topic_id, t2_id);
    }

    #[test]
    fn traversal_crosses_lesson_and_course_boundaries() {
        let t1 = sample_topic("T1", 1);
        let t2 = sample_topic("T2", 1);
        let t3 = sample_topic("T3", 1);
        let t3_id = t3.id;
        let done: HashSet<Uuid> = t1
            .activities
            .iter()
            .chain(t2.activities.iter())
            .map(|a| a.id)
            .collect();

        let catalog = vec![
            sample_course(
                "A",
                vec![
                    sample_lesson("L1", 1, vec![t1]),
                    sample_lesson("L2", 2, vec![t2]),
                ],
            ),
            sample_course("B", vec![sample_lesson("L1", 1, vec![t3])]),
        ];

        let hit = first_incomplete_topic(&catalog, &done).unwrap();
        assert_eq!(hit.topic_id, t3_id);
        assert_eq!(hit.course_title, "B");
    }

    #[test]
    fn next_after_skips_the_anchor_itself() {
        let t1 = sample_topic("T1", 1);
        let t2 = sample_topic("T2", 1);
        let t1_id = t1.id;
        let t2_id = t2.id;
        let catalog = vec![sample_course(
            "A",
            vec![sample_lesson("L1", 1, vec![t1, t2])],
        )];

        // Nothing is done, yet the anchor must not be returned.
        let hit = next_incomplete_after(&catalog, &HashSet::new(), t1_id).unwrap();
        assert_eq!(hit.topic_id, t2_id);
    }

    #[test]
    fn next_after_returns_none_at_end_of_catalog() {
        let t1 = sample_topic("T1", 1);
        let t1_id = t1.id;
        let catalog = vec![sample_course("A", vec![sample_lesson("L1", 1, vec![t1])])];

        assert!(next_incomplete_after(&catalog, &HashSet::new(), t1_id).is_none());
    }

    #[test]
    fn next_after_with_unknown_anchor_is_none() {
        let t1 = sample_topic("T1", 1);
        let catalog = vec![sample_course("A", vec![sample_lesson("L1", 1, vec![t1])])];

        assert!(next_incomplete_after(&catalog, &HashSet::new(), Uuid::new_v4()).is_none());
    }

    #[test]
    fn totals_count_only_catalog_activities() {
        let t1 = sample_topic("T1", 2);
        let mut done: HashSet<Uuid> = HashSet::new();
        done.insert(t1.activities[0].id);
        // A completion for an activity that was since removed from the catalog.
        done.insert(Uuid::new_v4());
        let catalog = vec![sample_course("A", vec![sample_lesson("L1", 1, vec![t1])])];

        let totals = catalog_totals(&catalog, &done);
        assert_eq!(totals.completed, 1);
        assert_eq!(totals.total, 2);
        assert_eq!(totals.percentage(), 50);
    }

    #[test]
    fn percentage_rounds_to_nearest_whole() {
        assert_eq!(
            ProgressTotals {
                completed: 1,
                total: 3
            }
            .percentage(),
            33
        );
        assert_eq!(
            ProgressTotals {
                completed: 2,
                total: 3
            }
            .percentage(),
            67
        );
        assert_eq!(
            ProgressTotals {
                completed: 1,
                total: 8
            }
            .percentage(),
            13
        );
    }

    #[test]
    fn percentage_of_empty_catalog_is_zero() {
        assert_eq!(
            ProgressTotals {
                completed: 0,
                total: 0
            }
            .percentage(),
            0
        );
    }
}
