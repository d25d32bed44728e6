pub mod domain;
pub mod ports;
pub mod progress;
pub mod time;
pub mod tracker;

pub use domain::{
    Activity, ActivityKind, AuthenticatedUser, Completion, Course, CourseSummary, IdentitySession,
    Lesson, Locale, Profile, Topic, TopicLocation,
};
pub use ports::{DatabaseService, IdentityService, PortError, PortResult};
pub use time::Clock;
pub use tracker::DashboardStats;
