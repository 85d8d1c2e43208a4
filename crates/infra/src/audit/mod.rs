//! Guardian audit trail forwarding.
//!
//! Entries are built here and handed to an external append-only log. This
//! crate never persists them; durability is the log's job once it accepts an
//! entry.

pub mod in_memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use guardian_auth::{AuthError, SessionKind};
use guardian_core::{AuditEntryId, SubjectId};

use crate::directory::CollaboratorError;

pub use in_memory::InMemoryAuditLog;

/// An immutable audit record, owned by the log collaborator once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: AuditEntryId,
    pub subject_id: SubjectId,
    pub action_type: String,
    pub target_system: String,
    pub details: JsonMap<String, JsonValue>,
    pub justification: Option<String>,
    pub affected_subjects: Vec<String>,
    pub value_impact: Option<f64>,
    pub invoked_authority: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A guardian action to be audited, before it is attributed to a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardianAction {
    pub action_type: String,
    pub target_system: String,
    pub details: JsonMap<String, JsonValue>,
    pub justification: Option<String>,
    pub affected_subjects: Vec<String>,
    pub value_impact: Option<f64>,
    pub invoked_authority: Option<String>,
}

/// Target recorded for authentication events.
pub const SESSION_TARGET: &str = "guardian_session";

impl GuardianAction {
    pub fn new(action_type: impl Into<String>, target_system: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            target_system: target_system.into(),
            details: JsonMap::new(),
            justification: None,
            affected_subjects: Vec::new(),
            value_impact: None,
            invoked_authority: None,
        }
    }

    /// `login`, or `emergency_login` for break-glass sessions.
    pub fn login(kind: SessionKind) -> Self {
        let action = match kind {
            SessionKind::Emergency => "emergency_login",
            SessionKind::Credentials | SessionKind::SacredKey => "login",
        };
        Self::new(action, SESSION_TARGET).with_detail("session_kind", kind.to_string())
    }

    pub fn logout(kind: SessionKind) -> Self {
        Self::new("logout", SESSION_TARGET).with_detail("session_kind", kind.to_string())
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    pub fn with_affected_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value_impact(mut self, value: f64) -> Self {
        self.value_impact = Some(value);
        self
    }

    pub fn with_invoked_authority(mut self, authority: impl Into<String>) -> Self {
        self.invoked_authority = Some(authority.into());
        self
    }

    /// Attribute the action to `subject_id` and stamp it.
    pub fn into_entry(self, subject_id: SubjectId, timestamp: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            entry_id: AuditEntryId::new(),
            subject_id,
            action_type: self.action_type,
            target_system: self.target_system,
            details: self.details,
            justification: self.justification,
            affected_subjects: self.affected_subjects,
            value_impact: self.value_impact,
            invoked_authority: self.invoked_authority,
            timestamp,
        }
    }
}

/// External append-only audit log.
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), CollaboratorError>;
}

/// Best-effort forwarder from guardian actions to the audit log.
///
/// Forwarding never fails the operation that triggered it: errors are logged
/// and reported as `false`.
#[derive(Clone)]
pub struct AuditForwarder {
    log: Arc<dyn AuditLog>,
}

impl AuditForwarder {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    /// Build an entry for `action` and forward it. Returns whether the log
    /// accepted it.
    pub async fn record(&self, subject_id: &SubjectId, action: GuardianAction) -> bool {
        let entry = action.into_entry(subject_id.clone(), Utc::now());
        let entry_id = entry.entry_id;
        let action_type = entry.action_type.clone();

        match self.log.append(entry).await {
            Ok(()) => {
                tracing::debug!(
                    %entry_id,
                    %subject_id,
                    action = %action_type,
                    "audit entry forwarded"
                );
                true
            }
            Err(err) => {
                let err = AuthError::AuditForwardingFailed(err.to_string());
                tracing::warn!(%entry_id, %subject_id, action = %action_type, "{err}");
                false
            }
        }
    }
}

impl core::fmt::Debug for AuditForwarder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditForwarder").finish_non_exhaustive()
    }
}
