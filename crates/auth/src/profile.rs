use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use guardian_core::SubjectId;

use crate::{AccessLevel, CeremonialAuthority, PermissionSet};

/// Guardian profile as held by the external identity store.
///
/// This is what the profile collaborator returns for a verified identity, and
/// the authoritative source of everything a session grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianProfile {
    /// Display identifier of the guardian. Credential logins fall back to the
    /// username when the store has none.
    #[serde(default)]
    pub subject_name: Option<String>,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub authorities: BTreeSet<CeremonialAuthority>,
    #[serde(default)]
    pub ethics_thresholds: BTreeMap<String, f64>,
}

impl GuardianProfile {
    pub fn new(access_level: AccessLevel) -> Self {
        Self {
            subject_name: None,
            access_level,
            specialization: None,
            permissions: PermissionSet::new(),
            authorities: BTreeSet::new(),
            ethics_thresholds: BTreeMap::new(),
        }
    }

    pub fn with_subject_name(mut self, name: impl Into<String>) -> Self {
        self.subject_name = Some(name.into());
        self
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<CeremonialAuthority>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    pub fn with_ethics_threshold(mut self, name: impl Into<String>, value: f64) -> Self {
        self.ethics_thresholds.insert(name.into(), value);
        self
    }
}

/// A verified guardian as returned by the one-step key directories
/// (sacred key and emergency): the subject identifier plus its full bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianGrant {
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub profile: GuardianProfile,
}

impl GuardianGrant {
    pub fn new(subject_id: SubjectId, profile: GuardianProfile) -> Self {
        Self { subject_id, profile }
    }
}
