use std::sync::Arc;

use crate::audit::{AuditLog, InMemoryAuditLog};
use crate::directory::{
    EmergencyDirectory, IdentityProvider, InMemoryGuardianDirectory, ProfileDirectory,
    SacredKeyDirectory,
};

/// Every external collaborator the session core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub sacred_keys: Arc<dyn SacredKeyDirectory>,
    pub emergency: Arc<dyn EmergencyDirectory>,
    pub audit_log: Arc<dyn AuditLog>,
}

impl Collaborators {
    /// Back every directory contract with one in-memory directory.
    pub fn in_memory(
        directory: Arc<InMemoryGuardianDirectory>,
        audit_log: Arc<InMemoryAuditLog>,
    ) -> Self {
        Self {
            identity: directory.clone(),
            profiles: directory.clone(),
            sacred_keys: directory.clone(),
            emergency: directory,
            audit_log,
        }
    }
}

impl core::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
