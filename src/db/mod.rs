pub mod attendance;
pub mod audit_events;
pub mod enrollments;
pub mod refresh_tokens;
pub mod reports;
pub mod users;
