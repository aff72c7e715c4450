use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::audit::catalog;
use crate::audit::RequestContext;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{AuditCategory, AuditEvent, AuditSeverity, AuditStatus, EventFilter};
use crate::state::SharedState;

/// Stats are computed over this trailing window.
const STATS_WINDOW_DAYS: i32 = 7;

/// Hard floor for the cleanup endpoint. Requests below it are rejected
/// before anything is deleted.
const MIN_RETENTION_DAYS: i32 = 30;
const DEFAULT_RETENTION_DAYS: i32 = 90;
/// Ceiling on the cleanup window; larger values overflow the interval
/// arithmetic in Postgres.
const MAX_RETENTION_DAYS: i32 = 36_500;

#[derive(Deserialize)]
pub struct EventsQuery {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct CleanupParams {
    pub days: Option<i32>,
}

pub async fn list_events(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scope = auth.audit_scope()?;
    let filter = parse_filter(&params)?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100).max(1);
    // Saturating: an absurd page number yields an empty page, not a panic.
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let events = db::audit_events::list(&state.pool, &filter, &scope, per_page, offset).await?;
    let total = db::audit_events::count(&state.pool, &filter, &scope).await?;

    Ok(Json(json!({
        "events": events,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    })))
}

pub async fn get_event(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditEvent>, AppError> {
    let scope = auth.audit_scope()?;
    let event = db::audit_events::find_by_id(&state.pool, id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Audit event not found".to_string()))?;
    Ok(Json(event))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scope = auth.audit_scope()?;
    let stats = db::audit_events::stats(&state.pool, &scope, STATS_WINDOW_DAYS).await?;
    Ok(Json(json!(stats)))
}

/// Users that appear in the caller's visible slice of the trail, for
/// populating filter dropdowns.
pub async fn users(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scope = auth.audit_scope()?;
    let actors = db::audit_events::distinct_actors(&state.pool, &scope).await?;
    Ok(Json(json!({ "users": actors })))
}

/// Static lookup lists for the audit filter UI.
pub async fn filters(auth: AuthUser) -> Result<Json<serde_json::Value>, AppError> {
    auth.audit_scope()?;
    Ok(Json(json!({
        "categories": AuditCategory::all().iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "severities": AuditSeverity::all().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "statuses": AuditStatus::all().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    })))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let scope = auth.audit_scope()?;
    let filter = parse_filter(&params)?;

    let events = db::audit_events::list_all(&state.pool, &filter, &scope).await?;
    let csv = export_csv(&events);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit-events.csv\"",
            ),
        ],
        csv,
    ))
}

pub async fn cleanup(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let days = params.days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if days < MIN_RETENTION_DAYS {
        return Err(AppError::BadRequest(format!(
            "Retention period must be at least {MIN_RETENTION_DAYS} days"
        )));
    }
    if days > MAX_RETENTION_DAYS {
        return Err(AppError::BadRequest(format!(
            "Retention period must be at most {MAX_RETENTION_DAYS} days"
        )));
    }

    let deleted = db::audit_events::delete_older_than(&state.pool, days).await?;

    let mut ctx = RequestContext::for_user(auth.user_id, auth.session_id);
    ctx.extra.insert("deleted_count".to_string(), json!(deleted));
    ctx.extra.insert("retain_days".to_string(), json!(days));
    state
        .audit
        .log_event(&catalog::AUDIT_CLEANUP, ctx)
        .map_err(AppError::Internal)?;

    tracing::info!(deleted, days, "Purged old audit events");

    Ok(Json(json!({ "deleted": deleted, "retain_days": days })))
}

fn parse_filter(params: &EventsQuery) -> Result<EventFilter, AppError> {
    Ok(EventFilter {
        category: parse_opt(params.category.as_deref())?,
        severity: parse_opt(params.severity.as_deref())?,
        status: parse_opt(params.status.as_deref())?,
        user_id: parse_opt(params.user_id.as_deref())?,
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        from: params
            .from
            .as_deref()
            .map(|raw| parse_date(raw, false))
            .transpose()?,
        to: params
            .to
            .as_deref()
            .map(|raw| parse_date(raw, true))
            .transpose()?,
    })
}

/// "all" (or an empty value) means no filtering on that dimension.
fn parse_opt<T: std::str::FromStr>(value: Option<&str>) -> Result<Option<T>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.is_empty() || raw.eq_ignore_ascii_case("all") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid filter value: {raw}"))),
    }
}

/// Accepts RFC 3339 timestamps or bare dates. A bare upper-bound date is
/// widened to the last representable instant of that day (timestamps have
/// microsecond resolution) so the range stays inclusive.
fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        if let Some(time) = time {
            return Ok(date.and_time(time).and_utc());
        }
    }
    Err(AppError::BadRequest(format!("Invalid date: {raw}")))
}

fn export_csv(events: &[AuditEvent]) -> String {
    use std::fmt::Write;

    const HEADERS: [&str; 17] = [
        "id",
        "user_id",
        "session_id",
        "action",
        "resource",
        "resource_id",
        "details",
        "ip_address",
        "user_agent",
        "severity",
        "category",
        "status",
        "country",
        "region",
        "city",
        "metadata",
        "created_at",
    ];

    let mut csv = String::new();
    let _ = writeln!(csv, "{}", HEADERS.map(csv_field).join(","));

    for event in events {
        let fields = [
            event.id.to_string(),
            event.user_id.map(|id| id.to_string()).unwrap_or_default(),
            event.session_id.clone().unwrap_or_default(),
            event.action.clone(),
            event.resource.clone(),
            event.resource_id.clone().unwrap_or_default(),
            event.details.clone(),
            event.ip_address.clone(),
            event.user_agent.clone(),
            event.severity.to_string(),
            event.category.to_string(),
            event.status.to_string(),
            event.country.clone().unwrap_or_default(),
            event.region.clone().unwrap_or_default(),
            event.city.clone().unwrap_or_default(),
            event.metadata.to_string(),
            event.created_at.to_rfc3339(),
        ];
        let _ = writeln!(csv, "{}", fields.map(|f| csv_field(&f)).join(","));
    }

    csv
}

/// Every field is quoted with embedded quotes doubled, so commas, quotes
/// and newlines inside values cannot break column alignment.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn query(overrides: impl FnOnce(&mut EventsQuery)) -> EventsQuery {
        let mut params = EventsQuery {
            category: None,
            severity: None,
            status: None,
            user_id: None,
            search: None,
            from: None,
            to: None,
            page: None,
            per_page: None,
        };
        overrides(&mut params);
        params
    }

    #[test]
    fn all_sentinel_disables_a_dimension() {
        let params = query(|q| {
            q.category = Some("all".to_string());
            q.severity = Some("All".to_string());
            q.user_id = Some("all".to_string());
        });
        let filter = parse_filter(&params).unwrap();
        assert!(filter.category.is_none());
        assert!(filter.severity.is_none());
        assert!(filter.user_id.is_none());
    }

    #[test]
    fn exact_values_are_parsed() {
        let id = Uuid::now_v7();
        let params = query(|q| {
            q.category = Some("user_management".to_string());
            q.status = Some("failed".to_string());
            q.user_id = Some(id.to_string());
        });
        let filter = parse_filter(&params).unwrap();
        assert_eq!(filter.category, Some(AuditCategory::UserManagement));
        assert_eq!(filter.status, Some(AuditStatus::Failed));
        assert_eq!(filter.user_id, Some(id));
    }

    #[test]
    fn bogus_filter_values_are_rejected() {
        let params = query(|q| q.category = Some("billing".to_string()));
        assert!(parse_filter(&params).is_err());

        let params = query(|q| q.user_id = Some("not-a-uuid".to_string()));
        assert!(parse_filter(&params).is_err());
    }

    #[test]
    fn blank_search_is_dropped() {
        let params = query(|q| q.search = Some("   ".to_string()));
        let filter = parse_filter(&params).unwrap();
        assert!(filter.search.is_none());
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let params = query(|q| {
            q.from = Some("2026-03-01".to_string());
            q.to = Some("2026-03-05".to_string());
        });
        let filter = parse_filter(&params).unwrap();

        let from = filter.from.unwrap();
        assert_eq!((from.hour(), from.minute(), from.second()), (0, 0, 0));

        let to = filter.to.unwrap();
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
        // The bound covers the whole final second at timestamp resolution.
        assert_eq!(to.timestamp_subsec_micros(), 999_999);
    }

    #[test]
    fn rfc3339_timestamps_pass_through() {
        let params = query(|q| q.from = Some("2026-03-01T12:30:00Z".to_string()));
        let filter = parse_filter(&params).unwrap();
        assert_eq!(filter.from.unwrap().hour(), 12);
    }

    #[test]
    fn unparseable_dates_are_rejected() {
        let params = query(|q| q.from = Some("yesterday".to_string()));
        assert!(parse_filter(&params).is_err());
    }

    #[test]
    fn every_csv_field_is_quoted() {
        assert_eq!(csv_field("plain"), "\"plain\"");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_field("He said, \"go\""), "\"He said, \"\"go\"\"\"");
    }

    #[test]
    fn csv_header_row_is_fully_quoted() {
        let csv = export_csv(&[]);
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("\"id\",\"user_id\""));
        assert!(header.ends_with("\"created_at\""));
    }
}
