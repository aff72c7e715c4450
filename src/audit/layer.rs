use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http_body::Body as HttpBody;
use ipnet::IpNet;
use serde_json::json;
use tower::{Layer, Service};

use crate::audit::catalog::AuditOptions;
use crate::audit::context::{build_event, AuditMeta, RequestContext};
use crate::audit::sink::AuditRecorder;
use crate::models::{AuditStatus, NewAuditEvent};
use crate::state::SharedState;

/// Attaches an audit descriptor to a route. Request facts are captured
/// before the handler runs, the outcome is read off the response, and the
/// finalized event is dispatched without delaying the response.
#[derive(Clone)]
pub struct AuditLayer {
    recorder: AuditRecorder,
    options: &'static AuditOptions,
    jwt_secret: Arc<str>,
    trusted_proxies: Arc<[IpNet]>,
    /// Most bytes of a captured body that end up in the event metadata.
    capture_limit: usize,
    /// Most bytes buffered from a request body. Matches the router-level
    /// body limit, so buffering here never rejects what the handler would
    /// have accepted.
    request_limit: usize,
}

impl AuditLayer {
    pub fn new(state: &SharedState, options: &'static AuditOptions) -> Self {
        Self {
            recorder: state.audit.clone(),
            options,
            jwt_secret: state.config.jwt_secret.as_str().into(),
            trusted_proxies: state.config.trusted_proxies.clone().into(),
            capture_limit: state.config.audit_body_limit,
            request_limit: state.config.max_body_size,
        }
    }

    /// Construct without an `AppState`, e.g. against an in-memory sink.
    pub fn with_recorder(recorder: AuditRecorder, options: &'static AuditOptions) -> Self {
        Self {
            recorder,
            options,
            jwt_secret: "".into(),
            trusted_proxies: Vec::new().into(),
            capture_limit: 8192,
            request_limit: 1_048_576,
        }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuditService<S> {
    inner: S,
    layer: AuditLayer,
}

impl<S> Service<Request> for AuditService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let layer = self.layer.clone();

        Box::pin(async move {
            let started = Instant::now();
            let options = layer.options;
            let mut ctx = RequestContext::capture(&req, &layer.jwt_secret, &layer.trusted_proxies);
            let meta = AuditMeta::default();

            if options.include_request_body {
                let (parts, body) = req.into_parts();
                match to_bytes(body, layer.request_limit).await {
                    Ok(bytes) => {
                        if !bytes.is_empty() {
                            // Store at most capture_limit bytes; the handler
                            // still sees the whole body.
                            let cap = layer.capture_limit.min(bytes.len());
                            ctx.request_body =
                                Some(String::from_utf8_lossy(&bytes[..cap]).into_owned());
                            if bytes.len() > cap {
                                ctx.extra
                                    .insert("request_body_truncated".to_string(), json!(true));
                            }
                        }
                        req = Request::from_parts(parts, Body::from(bytes));
                    }
                    Err(_) => {
                        // Body exceeds the request cap; answer 413 and audit that.
                        let pending =
                            PendingAudit::new(build_event(options, ctx), options.skip_success_logs);
                        let response = StatusCode::PAYLOAD_TOO_LARGE.into_response();
                        if let Some(event) = pending.finalize(
                            response.status().as_u16(),
                            started.elapsed(),
                            meta.drain(),
                        ) {
                            layer.recorder.dispatch(event);
                        }
                        return Ok(response);
                    }
                }
            }

            req.extensions_mut().insert(meta.clone());
            let pending = PendingAudit::new(build_event(options, ctx), options.skip_success_logs);

            let mut response = inner.call(req).await?;

            let mut extra = meta.drain();
            if options.include_response_body {
                // Buffer only when the body's exact size is known to fit the
                // capture cap; streamed or oversized bodies pass through
                // untouched.
                let (parts, body) = response.into_parts();
                let fits = body
                    .size_hint()
                    .exact()
                    .is_some_and(|len| len <= layer.capture_limit as u64);
                if fits {
                    let bytes = to_bytes(body, layer.capture_limit).await.unwrap_or_default();
                    if !bytes.is_empty() {
                        extra.insert(
                            "response_body".to_string(),
                            json!(String::from_utf8_lossy(&bytes).into_owned()),
                        );
                    }
                    response = Response::from_parts(parts, Body::from(bytes));
                } else {
                    extra.insert("response_body_skipped".to_string(), json!(true));
                    response = Response::from_parts(parts, body);
                }
            }

            if let Some(event) =
                pending.finalize(response.status().as_u16(), started.elapsed(), extra)
            {
                layer.recorder.dispatch(event);
            }

            Ok(response)
        })
    }
}

/// Holds the provisional event until the outcome is known. The first
/// `finalize` call consumes it; later calls are no-ops, so a duplicate
/// completion signal cannot produce a duplicate row.
struct PendingAudit {
    slot: Mutex<Option<NewAuditEvent>>,
    skip_success_logs: bool,
}

impl PendingAudit {
    fn new(event: NewAuditEvent, skip_success_logs: bool) -> Self {
        Self {
            slot: Mutex::new(Some(event)),
            skip_success_logs,
        }
    }

    fn finalize(
        &self,
        status_code: u16,
        elapsed: Duration,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Option<NewAuditEvent> {
        let mut slot = self.slot.lock().ok()?;
        let mut event = slot.take()?;

        let status = AuditStatus::from_status_code(status_code);
        if self.skip_success_logs && status == AuditStatus::Success {
            tracing::debug!(
                action = %event.action,
                "audit event suppressed for successful request"
            );
            return None;
        }

        event.finalize(status);
        if let serde_json::Value::Object(map) = &mut event.metadata {
            map.insert("status".to_string(), json!(status_code));
            map.insert(
                "duration_ms".to_string(),
                json!(elapsed.as_millis() as u64),
            );
            for (key, value) in extra {
                map.insert(key, value);
            }
        }

        Some(event)
    }
}
