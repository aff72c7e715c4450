use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use ipnet::IpNet;
use serde_json::json;
use uuid::Uuid;

use crate::audit::catalog::AuditOptions;
use crate::auth::extractor::token_from_headers;
use crate::auth::jwt;
use crate::models::{AuditStatus, NewAuditEvent};

/// Request facts captured before the handler runs. Everything is
/// best-effort; missing values fall back to "unknown" at build time.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub resource_id: Option<String>,
    pub method: String,
    /// Request path plus query string, as the client sent it.
    pub url: String,
    pub request_body: Option<String>,
    /// Extra metadata entries supplied by the call site.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RequestContext {
    /// Capture identity, client address, and request line from an incoming
    /// request. Token decoding is best-effort: an invalid or absent token
    /// just leaves the event anonymous.
    pub fn capture(req: &Request, jwt_secret: &str, trusted_proxies: &[IpNet]) -> Self {
        let headers = req.headers();
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let claims =
            token_from_headers(headers).and_then(|t| jwt::decode_token(&t, jwt_secret).ok());

        let path = req.uri().path();
        let url = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.to_string());

        RequestContext {
            user_id: claims.as_ref().map(|c| c.sub),
            session_id: claims.as_ref().map(|c| c.sid.to_string()),
            ip_address: client_ip(headers, peer, trusted_proxies),
            user_agent: header_value(headers, "user-agent"),
            referer: header_value(headers, "referer"),
            resource_id: path_resource_id(path),
            method: req.method().to_string(),
            url,
            request_body: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Context for events that do not originate from an HTTP request
    /// (maintenance jobs and other manual call sites).
    pub fn for_user(user_id: Uuid, session_id: Uuid) -> Self {
        RequestContext {
            user_id: Some(user_id),
            session_id: Some(session_id.to_string()),
            ..Default::default()
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Last UUID path segment, if any. Mutation routes address entities by UUID,
/// so this recovers the acted-on resource without per-route wiring.
fn path_resource_id(path: &str) -> Option<String> {
    path.rsplit('/')
        .find_map(|segment| Uuid::parse_str(segment).ok())
        .map(|id| id.to_string())
}

/// Resolve the client IP. X-Forwarded-For is only honored when the direct
/// peer is a trusted proxy, and the first non-proxy hop wins.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_proxies: &[IpNet],
) -> Option<String> {
    let peer = peer?;

    if !trusted_proxies.is_empty() && trusted_proxies.iter().any(|net| net.contains(&peer)) {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            for ip_str in xff.split(',').map(|s| s.trim()) {
                if let Ok(ip) = ip_str.parse::<IpAddr>() {
                    if !trusted_proxies.iter().any(|net| net.contains(&ip)) {
                        return Some(ip.to_string());
                    }
                }
            }
        }
    }

    Some(peer.to_string())
}

/// Build a provisional event from a descriptor and captured context. The
/// status starts out as success and is finalized once the outcome is known.
pub fn build_event(options: &AuditOptions, ctx: RequestContext) -> NewAuditEvent {
    let mut metadata = serde_json::Map::new();
    if !ctx.method.is_empty() {
        metadata.insert("method".to_string(), json!(ctx.method));
        metadata.insert("url".to_string(), json!(ctx.url));
    }
    if let Some(referer) = &ctx.referer {
        metadata.insert("referer".to_string(), json!(referer));
    }
    if let Some(body) = &ctx.request_body {
        metadata.insert("request_body".to_string(), json!(body));
    }
    for (key, value) in ctx.extra {
        metadata.insert(key, value);
    }

    NewAuditEvent {
        id: Uuid::now_v7(),
        user_id: ctx.user_id,
        session_id: ctx.session_id,
        action: options.action.to_string(),
        resource: options.resource.to_string(),
        resource_id: ctx.resource_id,
        details: format!("{} on {}", options.action, options.resource),
        ip_address: ctx.ip_address.unwrap_or_else(|| "unknown".to_string()),
        user_agent: ctx.user_agent.unwrap_or_else(|| "unknown".to_string()),
        severity: options.severity,
        category: options.category,
        status: AuditStatus::Success,
        country: None,
        region: None,
        city: None,
        metadata: serde_json::Value::Object(metadata),
    }
}

/// Request-scoped cell the audit layer injects as an extension. Handlers can
/// attach extra facts (e.g. the attempted login email) that end up in the
/// event metadata.
#[derive(Debug, Clone, Default)]
pub struct AuditMeta(Arc<Mutex<serde_json::Map<String, serde_json::Value>>>);

impl AuditMeta {
    pub fn insert(&self, key: &str, value: serde_json::Value) {
        if let Ok(mut map) = self.0.lock() {
            map.insert(key.to_string(), value);
        }
    }

    pub fn drain(&self) -> serde_json::Map<String, serde_json::Value> {
        match self.0.lock() {
            Ok(mut map) => std::mem::take(&mut *map),
            Err(_) => serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::catalog;
    use crate::models::{AuditCategory, AuditSeverity};
    use axum::http::HeaderValue;

    fn proxies(nets: &[&str]) -> Vec<IpNet> {
        nets.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn peer_ip_is_used_without_proxies() {
        let headers = HeaderMap::new();
        let ip = client_ip(&headers, Some("203.0.113.9".parse().unwrap()), &[]);
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn forwarded_for_is_ignored_from_untrusted_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        );
        let ip = client_ip(
            &headers,
            Some("203.0.113.9".parse().unwrap()),
            &proxies(&["10.0.0.0/8"]),
        );
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn forwarded_for_is_honored_from_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        );
        let ip = client_ip(
            &headers,
            Some("10.0.0.1".parse().unwrap()),
            &proxies(&["10.0.0.0/8"]),
        );
        assert_eq!(ip.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn missing_peer_yields_none() {
        assert_eq!(client_ip(&HeaderMap::new(), None, &[]), None);
    }

    #[test]
    fn resource_id_comes_from_last_uuid_segment() {
        let id = Uuid::now_v7();
        assert_eq!(
            path_resource_id(&format!("/api/v1/users/{id}")),
            Some(id.to_string())
        );
        assert_eq!(path_resource_id("/api/v1/users"), None);
    }

    #[test]
    fn build_event_fills_provisional_fields() {
        let ctx = RequestContext {
            method: "POST".to_string(),
            url: "/api/v1/attendance/clock-in".to_string(),
            ..Default::default()
        };
        let event = build_event(&catalog::CLOCK_IN, ctx);

        assert_eq!(event.action, "Clock In");
        assert_eq!(event.resource, "Attendance");
        assert_eq!(event.details, "Clock In on Attendance");
        assert_eq!(event.status, AuditStatus::Success);
        assert_eq!(event.ip_address, "unknown");
        assert_eq!(event.user_agent, "unknown");
        assert_eq!(event.category, AuditCategory::Attendance);
        assert_eq!(event.severity, AuditSeverity::Low);
        assert_eq!(event.metadata["method"], "POST");
        assert_eq!(event.metadata["url"], "/api/v1/attendance/clock-in");
    }

    #[test]
    fn capture_keeps_the_query_string() {
        let req = Request::builder()
            .uri("/api/v1/audit/events?per_page=5&page=2")
            .body(axum::body::Body::empty())
            .unwrap();
        let ctx = RequestContext::capture(&req, "secret", &[]);

        assert_eq!(ctx.url, "/api/v1/audit/events?per_page=5&page=2");
        assert_eq!(ctx.method, "GET");
        assert!(ctx.resource_id.is_none());
    }

    #[test]
    fn build_event_merges_extra_metadata() {
        let mut ctx = RequestContext::default();
        ctx.extra
            .insert("attempted_email".to_string(), json!("a@test.com"));
        let event = build_event(&catalog::USER_LOGIN, ctx);
        assert_eq!(event.metadata["attempted_email"], "a@test.com");
        assert!(event.metadata.get("method").is_none());
    }

    #[test]
    fn audit_meta_drain_empties_the_cell() {
        let meta = AuditMeta::default();
        meta.insert("k", json!(1));
        let drained = meta.drain();
        assert_eq!(drained.get("k"), Some(&json!(1)));
        assert!(meta.drain().is_empty());
    }
}
