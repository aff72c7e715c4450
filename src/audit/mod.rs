//! Append-only audit trail.
//!
//! Routes opt in by attaching an [`AuditLayer`] built from a static
//! descriptor in [`catalog`]. The layer snapshots request facts up front,
//! classifies the outcome from the response status, and hands the finished
//! event to an [`AuditRecorder`], which persists it on a detached task so
//! the response is never delayed by the write.

pub mod catalog;
pub mod context;
pub mod layer;
pub mod sink;

pub use context::{AuditMeta, RequestContext};
pub use layer::AuditLayer;
pub use sink::{AuditRecorder, AuditSink};
