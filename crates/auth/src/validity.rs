use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::SessionRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("session has expired")]
    Expired,
}

/// Deterministically validate a session record at `now`.
///
/// A record that fails this check must be treated as absent, never as a
/// partially valid session.
pub fn validate_session(
    session: &SessionRecord,
    now: DateTime<Utc>,
) -> Result<(), SessionValidationError> {
    if !session.authenticated {
        return Err(SessionValidationError::NotAuthenticated);
    }
    if now >= session.expires_at {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}
