//! Guardian directory boundary.
//!
//! Narrow contracts for the external identity store: password identity,
//! profile lookup, and the two one-step key directories.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryGuardianDirectory;
pub use r#trait::{
    CollaboratorError, EmergencyDirectory, IdentityProvider, ProfileDirectory, SacredKeyDirectory,
};
