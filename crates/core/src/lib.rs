//! `guardian-core`: identifier and error building blocks shared by the guardian crates.
//!
//! This crate contains **pure** primitives (no IO).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AuditEntryId, SubjectId};
