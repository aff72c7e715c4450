use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::audit::catalog::AuditOptions;
use crate::audit::context::{build_event, RequestContext};
use crate::db;
use crate::models::{AuditStatus, NewAuditEvent};

/// Destination for finalized audit events. One attempt per event; a failed
/// attempt is logged by the dispatcher and the event is dropped.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, event: NewAuditEvent) -> Result<(), String>;
}

pub struct PgAuditSink {
    pool: PgPool,
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn persist(&self, event: NewAuditEvent) -> Result<(), String> {
        db::audit_events::insert(&self.pool, &event)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Shared handle for recording audit events. Cloning is cheap; all clones
/// feed the same sink.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgAuditSink { pool }))
    }

    /// Hand a finalized event to the sink on a detached task. Never blocks
    /// and never surfaces an error to the caller; persistence failures go to
    /// the operational log only.
    pub fn dispatch(&self, event: NewAuditEvent) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.persist(event).await {
                tracing::error!("Failed to persist audit event: {e}");
            }
        });
    }

    /// Record an event outside the request interceptor (maintenance jobs,
    /// explicit in-handler events). The event is finalized as success.
    pub fn log_event(&self, options: &AuditOptions, ctx: RequestContext) -> Result<(), String> {
        self.log_event_with_status(options, ctx, AuditStatus::Success)
    }

    /// Like `log_event` but with an explicit outcome, e.g. warning.
    pub fn log_event_with_status(
        &self,
        options: &AuditOptions,
        ctx: RequestContext,
        status: AuditStatus,
    ) -> Result<(), String> {
        if options.action.trim().is_empty() {
            return Err("Audit action must not be empty".to_string());
        }
        if options.resource.trim().is_empty() {
            return Err("Audit resource must not be empty".to_string());
        }

        let mut event = build_event(options, ctx);
        event.finalize(status);
        self.dispatch(event);
        Ok(())
    }
}
