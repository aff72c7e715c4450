use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Low => "low",
            AuditSeverity::Medium => "medium",
            AuditSeverity::High => "high",
        }
    }

    pub fn all() -> &'static [AuditSeverity] {
        &[
            AuditSeverity::Low,
            AuditSeverity::Medium,
            AuditSeverity::High,
        ]
    }
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AuditSeverity::Low),
            "medium" => Ok(AuditSeverity::Medium),
            "high" => Ok(AuditSeverity::High),
            other => Err(format!("Unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Security,
    Academic,
    Submission,
    Attendance,
    UserManagement,
    System,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Security => "security",
            AuditCategory::Academic => "academic",
            AuditCategory::Submission => "submission",
            AuditCategory::Attendance => "attendance",
            AuditCategory::UserManagement => "user_management",
            AuditCategory::System => "system",
        }
    }

    pub fn all() -> &'static [AuditCategory] {
        &[
            AuditCategory::Security,
            AuditCategory::Academic,
            AuditCategory::Submission,
            AuditCategory::Attendance,
            AuditCategory::UserManagement,
            AuditCategory::System,
        ]
    }
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "security" => Ok(AuditCategory::Security),
            "academic" => Ok(AuditCategory::Academic),
            "submission" => Ok(AuditCategory::Submission),
            "attendance" => Ok(AuditCategory::Attendance),
            "user_management" => Ok(AuditCategory::UserManagement),
            "system" => Ok(AuditCategory::System),
            other => Err(format!("Unknown category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
    Warning,
}

impl AuditStatus {
    /// Classify an HTTP response code. 2xx and 3xx count as success,
    /// everything else as failed.
    pub fn from_status_code(code: u16) -> Self {
        if (200..400).contains(&code) {
            AuditStatus::Success
        } else {
            AuditStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failed => "failed",
            AuditStatus::Warning => "warning",
        }
    }

    pub fn all() -> &'static [AuditStatus] {
        &[
            AuditStatus::Success,
            AuditStatus::Failed,
            AuditStatus::Warning,
        ]
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditStatus::Success),
            "failed" => Ok(AuditStatus::Failed),
            "warning" => Ok(AuditStatus::Warning),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// A persisted audit event. Rows are append-only; there is no update path.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: String,
    pub ip_address: String,
    pub user_agent: String,
    pub severity: AuditSeverity,
    pub category: AuditCategory,
    pub status: AuditStatus,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An event that has been built but not yet persisted. The id is assigned at
/// build time (UUIDv7) so insertion order is recoverable from it.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: String,
    pub ip_address: String,
    pub user_agent: String,
    pub severity: AuditSeverity,
    pub category: AuditCategory,
    pub status: AuditStatus,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewAuditEvent {
    /// Stamp the final outcome onto a provisional event.
    pub fn finalize(&mut self, status: AuditStatus) {
        self.status = status;
        self.details = format!("{} - {}", self.details, status);
    }
}

/// Visibility boundary for audit reads, derived from the authenticated
/// caller. Admins see everything; instructors see only events belonging to
/// students enrolled under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditScope {
    All,
    Roster(Uuid),
}

/// Conjunctive optional filters for audit queries.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub category: Option<AuditCategory>,
    pub severity: Option<AuditSeverity>,
    pub status: Option<AuditStatus>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// A user that appears in at least one visible audit event.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuditActor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Aggregate counts over the trailing stats window.
#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub window_days: i64,
    pub total: i64,
    pub by_category: BTreeMap<String, i64>,
    pub by_severity: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
}
