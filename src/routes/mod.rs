pub mod attendance;
pub mod audit;
pub mod auth;
pub mod enrollments;
pub mod reports;
pub mod users;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::audit::{catalog, AuditLayer};
use crate::state::SharedState;

/// Wires the API surface. Sensitive routes carry an audit layer keyed by a
/// descriptor from the catalog; plain read routes do not.
pub fn api_routes(state: &SharedState) -> Router<SharedState> {
    Router::new()
        // Auth
        .route(
            "/api/v1/auth/register",
            post(auth::register).route_layer(AuditLayer::new(state, &catalog::USER_REGISTERED)),
        )
        .route(
            "/api/v1/auth/login",
            post(auth::login).route_layer(AuditLayer::new(state, &catalog::USER_LOGIN)),
        )
        .route(
            "/api/v1/auth/refresh",
            post(auth::refresh).route_layer(AuditLayer::new(state, &catalog::TOKEN_REFRESH)),
        )
        .route(
            "/api/v1/auth/logout",
            post(auth::logout).route_layer(AuditLayer::new(state, &catalog::USER_LOGOUT)),
        )
        .route(
            "/api/v1/auth/change-password",
            post(auth::change_password)
                .route_layer(AuditLayer::new(state, &catalog::PASSWORD_CHANGED)),
        )
        // Users
        .route("/api/v1/users", get(users::list))
        .route(
            "/api/v1/users",
            post(users::create).route_layer(AuditLayer::new(state, &catalog::USER_CREATED)),
        )
        .route(
            "/api/v1/users/{id}",
            delete(users::delete).route_layer(AuditLayer::new(state, &catalog::USER_DELETED)),
        )
        // Enrollments
        .route("/api/v1/enrollments", get(enrollments::list))
        .route(
            "/api/v1/enrollments",
            post(enrollments::create)
                .route_layer(AuditLayer::new(state, &catalog::STUDENT_ENROLLED)),
        )
        .route(
            "/api/v1/enrollments/{id}",
            delete(enrollments::delete)
                .route_layer(AuditLayer::new(state, &catalog::STUDENT_UNENROLLED)),
        )
        // Attendance
        .route("/api/v1/attendance", get(attendance::list))
        .route(
            "/api/v1/attendance/clock-in",
            post(attendance::clock_in).route_layer(AuditLayer::new(state, &catalog::CLOCK_IN)),
        )
        .route(
            "/api/v1/attendance/clock-out",
            post(attendance::clock_out).route_layer(AuditLayer::new(state, &catalog::CLOCK_OUT)),
        )
        // Practicum reports
        .route("/api/v1/reports", get(reports::list))
        .route(
            "/api/v1/reports",
            post(reports::create).route_layer(AuditLayer::new(state, &catalog::REPORT_SUBMITTED)),
        )
        // Audit trail
        .route(
            "/api/v1/audit/events",
            get(audit::list_events).delete(audit::cleanup),
        )
        .route("/api/v1/audit/events/{id}", get(audit::get_event))
        .route("/api/v1/audit/stats", get(audit::stats))
        .route("/api/v1/audit/users", get(audit::users))
        .route("/api/v1/audit/export", get(audit::export))
        .route("/api/v1/audit/filters", get(audit::filters))
}
