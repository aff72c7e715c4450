use crate::models::{AuditCategory, AuditSeverity};

/// Per-action audit descriptor. Route definitions and manual call sites
/// reference the statics below; entries are immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct AuditOptions {
    pub action: &'static str,
    pub resource: &'static str,
    pub category: AuditCategory,
    pub severity: AuditSeverity,
    /// Suppress the event entirely when the request succeeds. Used on
    /// high-volume routes where only failures are interesting.
    pub skip_success_logs: bool,
    pub include_request_body: bool,
    pub include_response_body: bool,
}

impl AuditOptions {
    pub const fn new(
        action: &'static str,
        resource: &'static str,
        category: AuditCategory,
    ) -> Self {
        Self {
            action,
            resource,
            category,
            severity: AuditSeverity::Low,
            skip_success_logs: false,
            include_request_body: false,
            include_response_body: false,
        }
    }

    pub const fn severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub const fn skip_success_logs(mut self) -> Self {
        self.skip_success_logs = true;
        self
    }

    pub const fn capture_request_body(mut self) -> Self {
        self.include_request_body = true;
        self
    }

    pub const fn capture_response_body(mut self) -> Self {
        self.include_response_body = true;
        self
    }
}

pub static USER_REGISTERED: AuditOptions =
    AuditOptions::new("User Registered", "User", AuditCategory::UserManagement)
        .severity(AuditSeverity::Medium);

// Only failed logins are persisted; a success here is routine traffic.
pub static USER_LOGIN: AuditOptions =
    AuditOptions::new("User Login", "Auth", AuditCategory::Security)
        .severity(AuditSeverity::Medium)
        .skip_success_logs();

pub static USER_LOGOUT: AuditOptions =
    AuditOptions::new("User Logout", "Auth", AuditCategory::Security);

pub static TOKEN_REFRESH: AuditOptions =
    AuditOptions::new("Token Refresh", "Auth", AuditCategory::Security).skip_success_logs();

pub static PASSWORD_CHANGED: AuditOptions =
    AuditOptions::new("Password Changed", "Auth", AuditCategory::Security)
        .severity(AuditSeverity::High);

pub static USER_CREATED: AuditOptions =
    AuditOptions::new("User Created", "User", AuditCategory::UserManagement)
        .severity(AuditSeverity::Medium);

pub static USER_DELETED: AuditOptions =
    AuditOptions::new("User Deleted", "User", AuditCategory::UserManagement)
        .severity(AuditSeverity::High);

pub static STUDENT_ENROLLED: AuditOptions =
    AuditOptions::new("Student Enrolled", "Enrollment", AuditCategory::Academic)
        .severity(AuditSeverity::Medium);

pub static STUDENT_UNENROLLED: AuditOptions =
    AuditOptions::new("Student Unenrolled", "Enrollment", AuditCategory::Academic)
        .severity(AuditSeverity::Medium);

pub static CLOCK_IN: AuditOptions =
    AuditOptions::new("Clock In", "Attendance", AuditCategory::Attendance)
        .capture_request_body();

pub static CLOCK_OUT: AuditOptions =
    AuditOptions::new("Clock Out", "Attendance", AuditCategory::Attendance);

pub static REPORT_SUBMITTED: AuditOptions = AuditOptions::new(
    "Report Submitted",
    "PracticumReport",
    AuditCategory::Submission,
)
.capture_request_body();

pub static AUDIT_CLEANUP: AuditOptions =
    AuditOptions::new("Audit Cleanup", "AuditEvent", AuditCategory::System)
        .severity(AuditSeverity::High);

pub static ALL: &[&AuditOptions] = &[
    &USER_REGISTERED,
    &USER_LOGIN,
    &USER_LOGOUT,
    &TOKEN_REFRESH,
    &PASSWORD_CHANGED,
    &USER_CREATED,
    &USER_DELETED,
    &STUDENT_ENROLLED,
    &STUDENT_UNENROLLED,
    &CLOCK_IN,
    &CLOCK_OUT,
    &REPORT_SUBMITTED,
    &AUDIT_CLEANUP,
];

pub fn find(action: &str) -> Option<&'static AuditOptions> {
    ALL.iter().copied().find(|o| o.action == action)
}
