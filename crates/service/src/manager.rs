//! Session lifecycle manager.
//!
//! Owns the single current guardian session: authenticates through the
//! [`CredentialVerifier`], persists through a [`SessionStore`], refreshes and
//! tears down per [`SessionKind`], and answers authorization queries against
//! whatever session is live right now.
//!
//! Lifecycle operations (login, logout, refresh, restore) are serialized by
//! one async lock, so a logout can never interleave with a refresh and leave
//! a half-cleared session behind. Queries never take that lock; they read the
//! latest published snapshot from a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};

use guardian_auth::{
    AuthError, PermissionExplanation, Secret, SessionKind, SessionLifetimes, SessionRecord,
    authorize,
};
use guardian_infra::{
    AuditForwarder, Collaborators, CredentialVerifier, GuardianAction, IdentityProvider,
    SessionStore,
};

use crate::refresh::{RefreshWorker, RefreshWorkerHandle};

/// Coarse lifecycle state published to observers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    Authenticating,
    SignedIn,
    Refreshing,
}

/// One of the three ways a guardian can sign in.
#[derive(Debug, Clone)]
pub enum LoginRequest {
    Credentials { username: String, password: Secret },
    SacredKey { subject_name: String, key: Secret },
    Emergency { subject_name: String, emergency_key: Secret },
}

impl LoginRequest {
    pub fn kind(&self) -> SessionKind {
        match self {
            LoginRequest::Credentials { .. } => SessionKind::Credentials,
            LoginRequest::SacredKey { .. } => SessionKind::SacredKey,
            LoginRequest::Emergency { .. } => SessionKind::Emergency,
        }
    }
}

pub struct SessionManager {
    verifier: CredentialVerifier,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionStore>,
    audit: AuditForwarder,
    lifetimes: SessionLifetimes,
    lifecycle: Mutex<()>,
    session: watch::Sender<Option<SessionRecord>>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        collaborators: &Collaborators,
        store: Arc<dyn SessionStore>,
        lifetimes: SessionLifetimes,
    ) -> Self {
        let audit = AuditForwarder::new(collaborators.audit_log.clone());
        let (session, _) = watch::channel(None);
        let (state, _) = watch::channel(SessionState::SignedOut);

        Self {
            verifier: CredentialVerifier::new(collaborators, audit.clone(), lifetimes),
            identity: collaborators.identity.clone(),
            store,
            audit,
            lifetimes,
            lifecycle: Mutex::new(()),
            session,
            state,
        }
    }

    /// Adopt the persisted session, if one is still valid.
    pub async fn restore(&self) -> Option<SessionRecord> {
        let _guard = self.lifecycle.lock().await;

        let restored = self.store.load().await?;
        tracing::info!(
            flow = %restored.session_kind,
            subject = %restored.subject_name,
            expires_at = %restored.expires_at,
            "restored persisted guardian session"
        );
        self.session.send_replace(Some(restored.clone()));
        self.state.send_replace(SessionState::SignedIn);
        Some(restored)
    }

    /// Run one of the login flows.
    ///
    /// Success replaces any previous session. Failure discards it: a failed
    /// login never leaves the previous guardian signed in. Either way a
    /// superseded session is torn down the same way [`logout`](Self::logout)
    /// does it, unless the new session is the same subject signing in again
    /// through the same flow.
    pub async fn authenticate(&self, request: LoginRequest) -> Result<SessionRecord, AuthError> {
        let _guard = self.lifecycle.lock().await;
        self.state.send_replace(SessionState::Authenticating);
        let _settle = SettleOnDrop(self);

        let result = match &request {
            LoginRequest::Credentials { username, password } => {
                self.verifier.verify_credentials(username, password).await
            }
            LoginRequest::SacredKey { subject_name, key } => {
                self.verifier.verify_sacred_key(subject_name, key).await
            }
            LoginRequest::Emergency {
                subject_name,
                emergency_key,
            } => {
                self.verifier
                    .verify_emergency_override(subject_name, emergency_key)
                    .await
            }
        };

        let previous = self.session.borrow().clone();
        match result {
            Ok(session) => {
                if let Some(previous) = previous {
                    let same_login = previous.session_kind == session.session_kind
                        && previous.subject_id == session.subject_id;
                    if !same_login {
                        self.tear_down(&previous).await;
                    }
                }
                self.store.save(&session).await;
                self.session.send_replace(Some(session.clone()));
                self.state.send_replace(SessionState::SignedIn);
                Ok(session)
            }
            Err(err) => {
                tracing::info!(flow = %request.kind(), "guardian login failed: {err}");
                if let Some(previous) = previous {
                    self.tear_down(&previous).await;
                }
                self.discard().await;
                Err(err)
            }
        }
    }

    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<Secret>,
    ) -> Result<SessionRecord, AuthError> {
        self.authenticate(LoginRequest::Credentials {
            username: username.into(),
            password: password.into(),
        })
        .await
    }

    pub async fn login_with_sacred_key(
        &self,
        subject_name: impl Into<String>,
        key: impl Into<Secret>,
    ) -> Result<SessionRecord, AuthError> {
        self.authenticate(LoginRequest::SacredKey {
            subject_name: subject_name.into(),
            key: key.into(),
        })
        .await
    }

    pub async fn emergency_login(
        &self,
        subject_name: impl Into<String>,
        emergency_key: impl Into<Secret>,
    ) -> Result<SessionRecord, AuthError> {
        self.authenticate(LoginRequest::Emergency {
            subject_name: subject_name.into(),
            emergency_key: emergency_key.into(),
        })
        .await
    }

    /// End the current session. Local state is always cleared, even when the
    /// identity collaborator or the audit log is unreachable.
    pub async fn logout(&self) {
        let _guard = self.lifecycle.lock().await;

        let current = self.session.borrow().clone();
        if let Some(session) = current {
            self.tear_down(&session).await;
        }
        self.discard().await;
    }

    /// Collaborator-side teardown of `session`: invalidate the identity
    /// session for credential logins, then audit the logout. Failures are
    /// logged only.
    async fn tear_down(&self, session: &SessionRecord) {
        match session.session_kind {
            SessionKind::Credentials => {
                if let Some(identity) = &session.subject_id {
                    if let Err(err) = self.identity.invalidate(identity).await {
                        tracing::warn!(%identity, "failed to invalidate identity session: {err}");
                    }
                }
            }
            SessionKind::SacredKey | SessionKind::Emergency => {}
        }

        if let Some(subject_id) = &session.subject_id {
            self.audit
                .record(subject_id, GuardianAction::logout(session.session_kind))
                .await;
        }
        tracing::info!(
            flow = %session.session_kind,
            subject = %session.subject_name,
            "guardian signed out"
        );
    }

    /// Extend the current session according to its kind.
    ///
    /// Without a session this is a no-op. An expired session, or one the
    /// identity collaborator refuses to extend, is cleared.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.lifecycle.lock().await;
        self.refresh_locked().await
    }

    /// Like [`refresh`](Self::refresh), but gives up immediately (`None`) when
    /// another lifecycle operation holds the lock.
    pub(crate) async fn try_refresh(&self) -> Option<Result<(), AuthError>> {
        let _guard = self.lifecycle.try_lock().ok()?;
        Some(self.refresh_locked().await)
    }

    async fn refresh_locked(&self) -> Result<(), AuthError> {
        let current = self.session.borrow().clone();
        let Some(mut session) = current else {
            return Ok(());
        };

        let now = Utc::now();
        if !session.is_valid_at(now) {
            tracing::info!(flow = %session.session_kind, "guardian session expired; signing out");
            self.discard().await;
            return Err(AuthError::SessionExpired);
        }

        self.state.send_replace(SessionState::Refreshing);
        let _settle = SettleOnDrop(self);
        match session.session_kind {
            SessionKind::Credentials => {
                let Some(identity) = session.subject_id.clone() else {
                    tracing::warn!("credentials session has no identity; signing out");
                    self.discard().await;
                    return Err(AuthError::SessionExpired);
                };
                match self.identity.refresh(&identity).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(%identity, "identity session was not renewed; signing out");
                        self.discard().await;
                        return Err(AuthError::SessionExpired);
                    }
                    Err(err) => {
                        tracing::warn!(%identity, "identity refresh failed ({err}); signing out");
                        self.discard().await;
                        return Err(AuthError::CollaboratorUnavailable);
                    }
                }
                session.extend(&self.lifetimes, now);
                self.publish_refreshed(session).await;
            }
            SessionKind::SacredKey => {
                session.extend(&self.lifetimes, now);
                self.publish_refreshed(session).await;
            }
            SessionKind::Emergency => {
                tracing::debug!("emergency sessions run to their original expiry");
            }
        }

        self.state.send_replace(SessionState::SignedIn);
        Ok(())
    }

    async fn publish_refreshed(&self, session: SessionRecord) {
        tracing::debug!(
            flow = %session.session_kind,
            expires_at = %session.expires_at,
            "guardian session extended"
        );
        self.store.save(&session).await;
        self.session.send_replace(Some(session));
    }

    /// Replace a transient state left behind by a cancelled operation with
    /// the one the held session implies.
    fn settle_state(&self) {
        let settled = if self.current_session().is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticating | SessionState::Refreshing => {
                *state = settled;
                true
            }
            SessionState::SignedIn | SessionState::SignedOut => false,
        });
    }

    async fn discard(&self) {
        self.session.send_replace(None);
        self.store.clear().await;
        self.state.send_replace(SessionState::SignedOut);
    }

    /// Forward an action taken under the current session to the audit log.
    ///
    /// Fails only when there is no live session to attribute it to; a
    /// forwarding failure is logged and swallowed.
    pub async fn log_action(&self, action: GuardianAction) -> Result<(), AuthError> {
        let Some(subject_id) = self.current_session().and_then(|s| s.subject_id) else {
            let err = AuthError::NoActiveSession;
            tracing::error!(action = %action.action_type, "cannot log guardian action: {err}");
            return Err(err);
        };
        self.audit.record(&subject_id, action).await;
        Ok(())
    }

    /// The current session, if it is still valid.
    pub fn current_session(&self) -> Option<SessionRecord> {
        self.session
            .borrow()
            .as_ref()
            .filter(|session| session.is_valid_at(Utc::now()))
            .cloned()
    }

    pub fn has_permission(&self, name: &str) -> bool {
        let current = self.session.borrow();
        let live = current.as_ref().filter(|s| s.is_valid_at(Utc::now()));
        authorize::has_permission(live, name)
    }

    pub fn has_ceremonial_authority(&self, name: &str) -> bool {
        let current = self.session.borrow();
        let live = current.as_ref().filter(|s| s.is_valid_at(Utc::now()));
        authorize::has_ceremonial_authority(live, name)
    }

    pub fn explain_permission(&self, name: &str) -> PermissionExplanation {
        let current = self.session.borrow();
        let live = current.as_ref().filter(|s| s.is_valid_at(Utc::now()));
        authorize::explain_permission(live, name)
    }

    /// Lifecycle state. A session that lapsed without a refresh reads as
    /// signed out.
    pub fn state(&self) -> SessionState {
        match *self.state.borrow() {
            SessionState::SignedIn if self.current_session().is_none() => SessionState::SignedOut,
            state => state,
        }
    }

    /// Observe session changes. Receivers see the raw record, expired or not.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionRecord>> {
        self.session.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether any record (even an expired one) is held.
    pub(crate) fn holds_session(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// Start the periodic refresh worker for this manager.
    pub fn spawn_refresh_worker(self: &Arc<Self>, interval: Duration) -> RefreshWorkerHandle {
        RefreshWorker::new(Arc::clone(self), interval).start()
    }
}

/// Settles the lifecycle state when an operation's future is dropped before
/// it published a final state. A no-op on normal completion.
struct SettleOnDrop<'a>(&'a SessionManager);

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.settle_state();
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("lifetimes", &self.lifetimes)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
