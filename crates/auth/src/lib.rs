//! `guardian-auth`: pure session and authorization boundary.
//!
//! This crate is intentionally decoupled from storage, collaborators and the
//! clock: every time-dependent function takes `now` explicitly.

pub mod access_level;
pub mod authorities;
pub mod authorize;
pub mod error;
pub mod permissions;
pub mod profile;
pub mod secret;
pub mod session;
pub mod validity;

pub use access_level::AccessLevel;
pub use authorities::CeremonialAuthority;
pub use authorize::{
    DenialKind, PermissionExplanation, explain_permission, has_ceremonial_authority,
    has_permission,
};
pub use error::AuthError;
pub use permissions::{KNOWN_PERMISSIONS, Permission, PermissionSet};
pub use profile::{GuardianGrant, GuardianProfile};
pub use secret::Secret;
pub use session::{SessionKind, SessionLifetimes, SessionRecord};
pub use validity::{SessionValidationError, validate_session};
