//! # shade-core
//!
//! Model types for shade's audit capture.
//!
//! This crate has no I/O beyond reading descriptor manifests:
//! - `OperationCode`: the frozen insert/update/delete taxonomy
//! - `TrackedEntity`: descriptor of a business table opted into auditing
//! - `ShapeDiff`: detects when an entity needs a cutover
//! - `AuditRegistry`: append-only chain of audit table versions per entity
//! - `AuditRecord`: a captured row as read back from an audit table

pub mod diff;
pub mod entity;
pub mod errors;
pub mod operation;
pub mod record;
pub mod registry;

pub use entity::{Column, ColumnType, TrackedEntity};
pub use errors::CoreError;
pub use operation::OperationCode;
pub use registry::{AuditRegistry, AuditTableVersion};
