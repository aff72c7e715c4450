use std::collections::BTreeMap;

use sqlx::postgres::PgArguments;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuditActor, AuditEvent, AuditScope, AuditStats, EventFilter, NewAuditEvent};

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>;

pub async fn insert(pool: &PgPool, event: &NewAuditEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (id, user_id, session_id, action, resource, resource_id,
                                   details, ip_address, user_agent, severity, category, status,
                                   country, region, city, metadata)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(event.id)
    .bind(event.user_id)
    .bind(event.session_id.as_deref())
    .bind(&event.action)
    .bind(&event.resource)
    .bind(event.resource_id.as_deref())
    .bind(&event.details)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .bind(event.severity)
    .bind(event.category)
    .bind(event.status)
    .bind(event.country.as_deref())
    .bind(event.region.as_deref())
    .bind(event.city.as_deref())
    .bind(&event.metadata)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    scope: &AuditScope,
) -> Result<Option<AuditEvent>, sqlx::Error> {
    match scope {
        AuditScope::All => {
            sqlx::query_as::<_, AuditEvent>("SELECT * FROM audit_events WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        AuditScope::Roster(instructor_id) => {
            sqlx::query_as::<_, AuditEvent>(
                "SELECT * FROM audit_events
                 WHERE id = $1
                   AND user_id IN (SELECT student_id FROM enrollments WHERE instructor_id = $2)",
            )
            .bind(id)
            .bind(*instructor_id)
            .fetch_optional(pool)
            .await
        }
    }
}

pub async fn list(
    pool: &PgPool,
    filter: &EventFilter,
    scope: &AuditScope,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let (clause, n) = where_clause(filter, scope, 1);
    let sql = format!(
        "SELECT * FROM audit_events{clause}
         ORDER BY created_at DESC, id DESC LIMIT ${n} OFFSET ${}",
        n + 1
    );
    let query = bind_filter(sqlx::query_as::<_, AuditEvent>(&sql), filter, scope);
    query.bind(limit).bind(offset).fetch_all(pool).await
}

/// Full filtered result set in the same order as `list`, for exports.
pub async fn list_all(
    pool: &PgPool,
    filter: &EventFilter,
    scope: &AuditScope,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let (clause, _) = where_clause(filter, scope, 1);
    let sql = format!("SELECT * FROM audit_events{clause} ORDER BY created_at DESC, id DESC");
    let query = bind_filter(sqlx::query_as::<_, AuditEvent>(&sql), filter, scope);
    query.fetch_all(pool).await
}

pub async fn count(
    pool: &PgPool,
    filter: &EventFilter,
    scope: &AuditScope,
) -> Result<i64, sqlx::Error> {
    let (clause, _) = where_clause(filter, scope, 1);
    let sql = format!("SELECT COUNT(*) FROM audit_events{clause}");
    let query = bind_filter(sqlx::query_as::<_, (i64,)>(&sql), filter, scope);
    let row = query.fetch_one(pool).await?;
    Ok(row.0)
}

/// Users appearing in at least one visible event. Recomputed per call,
/// so it always reflects the caller's current roster.
pub async fn distinct_actors(
    pool: &PgPool,
    scope: &AuditScope,
) -> Result<Vec<AuditActor>, sqlx::Error> {
    match scope {
        AuditScope::All => {
            sqlx::query_as::<_, AuditActor>(
                "SELECT DISTINCT u.id, u.name, u.email
                 FROM audit_events e JOIN users u ON e.user_id = u.id
                 ORDER BY u.name",
            )
            .fetch_all(pool)
            .await
        }
        AuditScope::Roster(instructor_id) => {
            sqlx::query_as::<_, AuditActor>(
                "SELECT DISTINCT u.id, u.name, u.email
                 FROM audit_events e JOIN users u ON e.user_id = u.id
                 WHERE e.user_id IN (SELECT student_id FROM enrollments WHERE instructor_id = $1)
                 ORDER BY u.name",
            )
            .bind(*instructor_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn stats(
    pool: &PgPool,
    scope: &AuditScope,
    window_days: i32,
) -> Result<AuditStats, sqlx::Error> {
    let scope_sql = match scope {
        AuditScope::All => String::new(),
        AuditScope::Roster(_) => format!(" AND {}", roster_condition(2)),
    };

    let sql = format!(
        "SELECT COUNT(*) FROM audit_events
         WHERE created_at >= now() - make_interval(days => $1){scope_sql}"
    );
    let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(window_days);
    if let AuditScope::Roster(instructor_id) = scope {
        query = query.bind(*instructor_id);
    }
    let total = query.fetch_one(pool).await?.0;

    Ok(AuditStats {
        window_days: i64::from(window_days),
        total,
        by_category: grouped_counts(pool, "category", scope, window_days).await?,
        by_severity: grouped_counts(pool, "severity", scope, window_days).await?,
        by_status: grouped_counts(pool, "status", scope, window_days).await?,
    })
}

/// Deletes events older than the given number of days and returns how many
/// rows went away.
pub async fn delete_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM audit_events WHERE created_at < now() - make_interval(days => $1)",
    )
    .bind(days)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn grouped_counts(
    pool: &PgPool,
    column: &str,
    scope: &AuditScope,
    window_days: i32,
) -> Result<BTreeMap<String, i64>, sqlx::Error> {
    let scope_sql = match scope {
        AuditScope::All => String::new(),
        AuditScope::Roster(_) => format!(" AND {}", roster_condition(2)),
    };
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM audit_events
         WHERE created_at >= now() - make_interval(days => $1){scope_sql}
         GROUP BY {column}"
    );
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql).bind(window_days);
    if let AuditScope::Roster(instructor_id) = scope {
        query = query.bind(*instructor_id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

/// Builds the WHERE clause for a filtered query, numbering placeholders from
/// `start`. Conditions appear in a fixed order; `bind_filter` must bind
/// values in that same order.
fn where_clause(filter: &EventFilter, scope: &AuditScope, start: usize) -> (String, usize) {
    let mut conditions: Vec<String> = Vec::new();
    let mut n = start;

    if filter.category.is_some() {
        conditions.push(format!("category = ${n}"));
        n += 1;
    }
    if filter.severity.is_some() {
        conditions.push(format!("severity = ${n}"));
        n += 1;
    }
    if filter.status.is_some() {
        conditions.push(format!("status = ${n}"));
        n += 1;
    }
    if filter.user_id.is_some() {
        conditions.push(format!("user_id = ${n}"));
        n += 1;
    }
    if filter.search.is_some() {
        conditions.push(format!(
            "(action ILIKE ${n} OR resource ILIKE ${n} OR details ILIKE ${n})"
        ));
        n += 1;
    }
    if filter.from.is_some() {
        conditions.push(format!("created_at >= ${n}"));
        n += 1;
    }
    if filter.to.is_some() {
        conditions.push(format!("created_at <= ${n}"));
        n += 1;
    }
    if matches!(scope, AuditScope::Roster(_)) {
        conditions.push(roster_condition(n));
        n += 1;
    }

    if conditions.is_empty() {
        (String::new(), n)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), n)
    }
}

fn bind_filter<'q, O>(
    mut query: PgQueryAs<'q, O>,
    filter: &EventFilter,
    scope: &AuditScope,
) -> PgQueryAs<'q, O> {
    if let Some(category) = filter.category {
        query = query.bind(category);
    }
    if let Some(severity) = filter.severity {
        query = query.bind(severity);
    }
    if let Some(status) = filter.status {
        query = query.bind(status);
    }
    if let Some(user_id) = filter.user_id {
        query = query.bind(user_id);
    }
    if let Some(search) = &filter.search {
        query = query.bind(format!("%{}%", escape_like(search)));
    }
    if let Some(from) = filter.from {
        query = query.bind(from);
    }
    if let Some(to) = filter.to {
        query = query.bind(to);
    }
    if let AuditScope::Roster(instructor_id) = scope {
        query = query.bind(*instructor_id);
    }
    query
}

fn roster_condition(n: usize) -> String {
    format!("user_id IN (SELECT student_id FROM enrollments WHERE instructor_id = ${n})")
}

/// Escapes LIKE metacharacters so user input matches literally.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
