use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use guardian_auth::{GuardianGrant, GuardianProfile, Secret};
use guardian_core::SubjectId;

use super::r#trait::{
    CollaboratorError, EmergencyDirectory, IdentityProvider, ProfileDirectory, SacredKeyDirectory,
};

#[derive(Debug, Clone)]
struct Account {
    identity: SubjectId,
    password: String,
}

#[derive(Debug, Clone)]
struct KeyBinding {
    subject_id: SubjectId,
    key: String,
}

#[derive(Debug)]
struct DirectoryState {
    accounts: HashMap<String, Account>,
    profiles: HashMap<SubjectId, GuardianProfile>,
    sacred_keys: HashMap<String, KeyBinding>,
    emergency_keys: HashMap<String, KeyBinding>,
    inactive: HashSet<SubjectId>,
    /// Identities with a live collaborator-side session.
    live_sessions: HashSet<SubjectId>,
    unavailable: bool,
    refresh_allowed: bool,
    invalidate_fails: bool,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            profiles: HashMap::new(),
            sacred_keys: HashMap::new(),
            emergency_keys: HashMap::new(),
            inactive: HashSet::new(),
            live_sessions: HashSet::new(),
            unavailable: false,
            refresh_allowed: true,
            invalidate_fails: false,
        }
    }
}

/// In-memory stand-in for the external guardian identity store.
///
/// Implements every directory contract so a single instance can back a whole
/// manager. Intended for tests/dev; the failure toggles simulate an
/// unreachable or uncooperative collaborator.
#[derive(Debug, Default)]
pub struct InMemoryGuardianDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryGuardianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectoryState>, CollaboratorError> {
        let state = self
            .state
            .read()
            .map_err(|_| CollaboratorError::unavailable("lock poisoned"))?;
        if state.unavailable {
            return Err(CollaboratorError::unavailable("directory offline"));
        }
        Ok(state)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DirectoryState>, CollaboratorError> {
        let state = self
            .state
            .write()
            .map_err(|_| CollaboratorError::unavailable("lock poisoned"))?;
        if state.unavailable {
            return Err(CollaboratorError::unavailable("directory offline"));
        }
        Ok(state)
    }

    fn configure(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register (or replace) the profile of a guardian.
    pub fn add_guardian(&self, subject_id: SubjectId, profile: GuardianProfile) {
        self.configure().profiles.insert(subject_id, profile);
    }

    /// Register a password login for an existing guardian identity.
    pub fn add_account(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
        identity: SubjectId,
    ) {
        self.configure().accounts.insert(
            email.into(),
            Account {
                identity,
                password: password.into(),
            },
        );
    }

    pub fn add_sacred_key(
        &self,
        subject_name: impl Into<String>,
        key: impl Into<String>,
        subject_id: SubjectId,
    ) {
        self.configure().sacred_keys.insert(
            subject_name.into(),
            KeyBinding {
                subject_id,
                key: key.into(),
            },
        );
    }

    pub fn add_emergency_key(
        &self,
        subject_name: impl Into<String>,
        key: impl Into<String>,
        subject_id: SubjectId,
    ) {
        self.configure().emergency_keys.insert(
            subject_name.into(),
            KeyBinding {
                subject_id,
                key: key.into(),
            },
        );
    }

    pub fn remove_guardian(&self, subject_id: &SubjectId) {
        self.configure().profiles.remove(subject_id);
    }

    pub fn deactivate(&self, subject_id: SubjectId) {
        self.configure().inactive.insert(subject_id);
    }

    /// Simulate the whole directory being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.configure().unavailable = unavailable;
    }

    /// When false, identity refreshes are declined.
    pub fn set_refresh_allowed(&self, allowed: bool) {
        self.configure().refresh_allowed = allowed;
    }

    /// When true, identity invalidation reports an error (the session is
    /// still dropped on this side).
    pub fn set_invalidate_fails(&self, fails: bool) {
        self.configure().invalidate_fails = fails;
    }

    pub fn has_live_session(&self, identity: &SubjectId) -> bool {
        self.configure().live_sessions.contains(identity)
    }

    fn grant_for(
        state: &DirectoryState,
        binding: Option<&KeyBinding>,
        key: &Secret,
    ) -> Result<GuardianGrant, CollaboratorError> {
        let binding = binding.ok_or(CollaboratorError::NotFound)?;
        if binding.key != key.expose() {
            return Err(CollaboratorError::Rejected);
        }
        if state.inactive.contains(&binding.subject_id) {
            return Err(CollaboratorError::Inactive);
        }
        let profile = state
            .profiles
            .get(&binding.subject_id)
            .cloned()
            .ok_or(CollaboratorError::NotFound)?;
        Ok(GuardianGrant::new(binding.subject_id.clone(), profile))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryGuardianDirectory {
    async fn verify_password(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<SubjectId, CollaboratorError> {
        let mut state = self.write()?;
        let account = state.accounts.get(email).ok_or(CollaboratorError::NotFound)?;
        if account.password != password.expose() {
            return Err(CollaboratorError::Rejected);
        }
        let identity = account.identity.clone();
        if state.inactive.contains(&identity) {
            return Err(CollaboratorError::Inactive);
        }
        state.live_sessions.insert(identity.clone());
        Ok(identity)
    }

    async fn invalidate(&self, identity: &SubjectId) -> Result<(), CollaboratorError> {
        let mut state = self.write()?;
        state.live_sessions.remove(identity);
        if state.invalidate_fails {
            return Err(CollaboratorError::unavailable("invalidate rejected"));
        }
        Ok(())
    }

    async fn refresh(&self, identity: &SubjectId) -> Result<bool, CollaboratorError> {
        let state = self.read()?;
        Ok(state.refresh_allowed && state.live_sessions.contains(identity))
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for InMemoryGuardianDirectory {
    async fn fetch_profile(
        &self,
        identity: &SubjectId,
    ) -> Result<GuardianProfile, CollaboratorError> {
        let state = self.read()?;
        if state.inactive.contains(identity) {
            return Err(CollaboratorError::Inactive);
        }
        state
            .profiles
            .get(identity)
            .cloned()
            .ok_or(CollaboratorError::NotFound)
    }
}

#[async_trait::async_trait]
impl SacredKeyDirectory for InMemoryGuardianDirectory {
    async fn verify(
        &self,
        subject_name: &str,
        key: &Secret,
    ) -> Result<GuardianGrant, CollaboratorError> {
        let state = self.read()?;
        Self::grant_for(&state, state.sacred_keys.get(subject_name), key)
    }
}

#[async_trait::async_trait]
impl EmergencyDirectory for InMemoryGuardianDirectory {
    async fn verify(
        &self,
        subject_name: &str,
        emergency_key: &Secret,
    ) -> Result<GuardianGrant, CollaboratorError> {
        let state = self.read()?;
        Self::grant_for(&state, state.emergency_keys.get(subject_name), emergency_key)
    }
}

#[cfg(test)]
mod tests {
    use guardian_auth::AccessLevel;

    use super::*;

    fn subject(id: &str) -> SubjectId {
        SubjectId::parse(id).unwrap()
    }

    fn seeded() -> InMemoryGuardianDirectory {
        let directory = InMemoryGuardianDirectory::new();
        directory.add_guardian(
            subject("g-1"),
            GuardianProfile::new(AccessLevel::Overseer).with_subject_name("Guardian-X"),
        );
        directory.add_account("x@guardians.test", "hunter2", subject("g-1"));
        directory.add_sacred_key("Guardian-X", "KEY1", subject("g-1"));
        directory.add_emergency_key("Guardian-X", "EMKEY", subject("g-1"));
        directory
    }

    #[tokio::test]
    async fn password_login_opens_identity_session() {
        let directory = seeded();
        let identity = directory
            .verify_password("x@guardians.test", &Secret::new("hunter2"))
            .await
            .unwrap();
        assert_eq!(identity, subject("g-1"));
        assert!(directory.has_live_session(&identity));
        assert!(IdentityProvider::refresh(&directory, &identity).await.unwrap());

        directory.invalidate(&identity).await.unwrap();
        assert!(!directory.has_live_session(&identity));
        assert!(!IdentityProvider::refresh(&directory, &identity).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_account() {
        let directory = seeded();
        assert_eq!(
            directory
                .verify_password("x@guardians.test", &Secret::new("nope"))
                .await,
            Err(CollaboratorError::Rejected)
        );
        assert_eq!(
            directory
                .verify_password("who@guardians.test", &Secret::new("hunter2"))
                .await,
            Err(CollaboratorError::NotFound)
        );
    }

    #[tokio::test]
    async fn sacred_and_emergency_keys_are_distinct() {
        let directory = seeded();
        let grant = SacredKeyDirectory::verify(&directory, "Guardian-X", &Secret::new("KEY1"))
            .await
            .unwrap();
        assert_eq!(grant.subject_id, subject("g-1"));

        assert_eq!(
            SacredKeyDirectory::verify(&directory, "Guardian-X", &Secret::new("EMKEY")).await,
            Err(CollaboratorError::Rejected)
        );
        assert!(
            EmergencyDirectory::verify(&directory, "Guardian-X", &Secret::new("EMKEY"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn inactive_and_offline_directory() {
        let directory = seeded();
        directory.deactivate(subject("g-1"));
        assert_eq!(
            SacredKeyDirectory::verify(&directory, "Guardian-X", &Secret::new("KEY1")).await,
            Err(CollaboratorError::Inactive)
        );

        directory.set_unavailable(true);
        assert!(matches!(
            directory.fetch_profile(&subject("g-1")).await,
            Err(CollaboratorError::Unavailable(_))
        ));
    }
}
