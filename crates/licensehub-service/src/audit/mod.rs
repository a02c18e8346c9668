//! Append-only license history.

pub mod recorder;

pub use recorder::AuditRecorder;
