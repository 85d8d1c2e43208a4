//! The authenticated session value.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use guardian_core::{DomainError, SubjectId};

use crate::{AccessLevel, CeremonialAuthority, GuardianProfile, Permission, PermissionSet};

/// Which authentication flow produced a session.
///
/// The kind decides how a session is refreshed and how sign-out is handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Username/password verified by the identity collaborator.
    Credentials,
    /// Long-lived shared secret, verified in one step.
    SacredKey,
    /// Break-glass override with a short, non-refreshable lifetime.
    Emergency,
}

impl core::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionKind::Credentials => f.write_str("credentials"),
            SessionKind::SacredKey => f.write_str("sacred_key"),
            SessionKind::Emergency => f.write_str("emergency"),
        }
    }
}

/// Session lifetimes per kind.
///
/// # Invariants
/// - Both lifetimes are strictly positive.
/// - The emergency lifetime is at most half the standard lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionLifetimes {
    standard: Duration,
    emergency: Duration,
}

impl SessionLifetimes {
    pub fn new(standard: Duration, emergency: Duration) -> Result<Self, DomainError> {
        if standard <= Duration::zero() || emergency <= Duration::zero() {
            return Err(DomainError::validation("session lifetimes must be positive"));
        }
        if emergency * 2 > standard {
            return Err(DomainError::invariant(format!(
                "emergency lifetime ({}m) must be at most half the standard lifetime ({}m)",
                emergency.num_minutes(),
                standard.num_minutes()
            )));
        }
        Ok(Self { standard, emergency })
    }

    pub fn standard(&self) -> Duration {
        self.standard
    }

    pub fn emergency(&self) -> Duration {
        self.emergency
    }

    pub fn for_kind(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Credentials | SessionKind::SacredKey => self.standard,
            SessionKind::Emergency => self.emergency,
        }
    }
}

impl Default for SessionLifetimes {
    /// 8 hours for credential and sacred-key sessions, 2 hours for emergency ones.
    fn default() -> Self {
        Self {
            standard: Duration::hours(8),
            emergency: Duration::hours(2),
        }
    }
}

/// An authenticated guardian session.
///
/// # Invariants
/// - A record is either fully valid (`authenticated` and `expires_at` in the
///   future) or must be treated as absent.
/// - `is_emergency_session` is true iff `session_kind` is `Emergency`, and
///   such sessions always carry `emergency_override` and
///   `emergency_intervention`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authenticated: bool,
    pub subject_name: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub granted_permissions: PermissionSet,
    #[serde(default)]
    pub ceremonial_authorities: BTreeSet<CeremonialAuthority>,
    #[serde(default)]
    pub ethics_thresholds: BTreeMap<String, f64>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub session_kind: SessionKind,
    #[serde(default)]
    pub is_emergency_session: bool,
}

impl SessionRecord {
    /// Mint a fresh session from a verified profile.
    ///
    /// Emergency sessions get the union of the stored grants and the
    /// break-glass permission/authority, plus the short lifetime.
    pub fn issue(
        kind: SessionKind,
        subject_name: impl Into<String>,
        subject_id: Option<SubjectId>,
        profile: GuardianProfile,
        lifetimes: &SessionLifetimes,
        now: DateTime<Utc>,
    ) -> Self {
        let GuardianProfile {
            access_level,
            specialization,
            mut permissions,
            mut authorities,
            ethics_thresholds,
            ..
        } = profile;

        let is_emergency_session = kind == SessionKind::Emergency;
        if is_emergency_session {
            permissions.grant(Permission::EMERGENCY_OVERRIDE);
            authorities.insert(CeremonialAuthority::EMERGENCY_INTERVENTION);
        }

        Self {
            authenticated: true,
            subject_name: subject_name.into(),
            access_level,
            specialization,
            subject_id,
            granted_permissions: permissions,
            ceremonial_authorities: authorities,
            ethics_thresholds,
            issued_at: now,
            expires_at: now + lifetimes.for_kind(kind),
            session_kind: kind,
            is_emergency_session,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.authenticated && self.expires_at > now
    }

    /// Time left before expiry, or `None` once the session is no longer valid.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.is_valid_at(now).then(|| self.expires_at - now)
    }

    /// Slide the expiry to `now` plus the lifetime of this session's kind.
    pub fn extend(&mut self, lifetimes: &SessionLifetimes, now: DateTime<Utc>) {
        self.expires_at = now + lifetimes.for_kind(self.session_kind);
    }

    pub fn holds_authority(&self, name: &str) -> bool {
        self.ceremonial_authorities.iter().any(|a| a.as_str() == name)
    }
}
