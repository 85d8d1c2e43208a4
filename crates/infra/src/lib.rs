//! Infrastructure layer: collaborator contracts, session persistence, audit
//! forwarding and credential verification.

pub mod audit;
pub mod collaborators;
pub mod directory;
pub mod session_store;
pub mod verifier;

pub use audit::{AuditEntry, AuditForwarder, AuditLog, GuardianAction, InMemoryAuditLog};
pub use collaborators::Collaborators;
pub use directory::{
    CollaboratorError, EmergencyDirectory, IdentityProvider, InMemoryGuardianDirectory,
    ProfileDirectory, SacredKeyDirectory,
};
pub use session_store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
pub use verifier::CredentialVerifier;
