pub mod attendance;
pub mod audit_event;
pub mod enrollment;
pub mod refresh_token;
pub mod report;
pub mod user;

pub use attendance::AttendanceRecord;
pub use audit_event::{
    AuditActor, AuditCategory, AuditEvent, AuditScope, AuditSeverity, AuditStats, AuditStatus,
    EventFilter, NewAuditEvent,
};
pub use enrollment::Enrollment;
pub use refresh_token::RefreshToken;
pub use report::PracticumReport;
pub use user::{Role, User};
