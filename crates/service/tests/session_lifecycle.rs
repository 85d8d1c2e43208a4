//! End-to-end session lifecycle against in-memory collaborators.

use std::sync::Arc;

use chrono::{Duration, Utc};

use guardian_auth::{
    AccessLevel, AuthError, GuardianProfile, PermissionSet, SessionKind, SessionLifetimes,
    has_ceremonial_authority, has_permission,
};
use guardian_core::SubjectId;
use guardian_infra::{
    Collaborators, InMemoryAuditLog, InMemoryGuardianDirectory, InMemorySessionStore,
    SessionStore, SqliteSessionStore,
};
use guardian_service::{SessionManager, SessionState};

struct Harness {
    directory: Arc<InMemoryGuardianDirectory>,
    audit_log: Arc<InMemoryAuditLog>,
    store: Arc<InMemorySessionStore>,
    manager: SessionManager,
}

fn subject(id: &str) -> SubjectId {
    SubjectId::parse(id).unwrap()
}

fn harness() -> Harness {
    let directory = Arc::new(InMemoryGuardianDirectory::new());

    directory.add_guardian(
        subject("g-x"),
        GuardianProfile::new(AccessLevel::Curator)
            .with_subject_name("Guardian-X")
            .with_specialization("water rights")
            .with_permissions(PermissionSet::granting(["view_metrics", "ethics_review"])),
    );
    directory.add_account("x@guardians.test", "hunter2", subject("g-x"));
    directory.add_sacred_key("Guardian-X", "KEY1", subject("g-x"));
    directory.add_emergency_key("Guardian-X", "EMKEY", subject("g-x"));

    directory.add_guardian(
        subject("g-y"),
        GuardianProfile::new(AccessLevel::Observer).with_subject_name("Guardian-Y"),
    );
    directory.add_account("y@guardians.test", "correct-horse", subject("g-y"));

    let audit_log = Arc::new(InMemoryAuditLog::new());
    let store = Arc::new(InMemorySessionStore::new());
    let manager = SessionManager::new(
        &Collaborators::in_memory(directory.clone(), audit_log.clone()),
        store.clone(),
        SessionLifetimes::default(),
    );

    Harness {
        directory,
        audit_log,
        store,
        manager,
    }
}

#[tokio::test]
async fn scenario_a_sacred_key_login() {
    let h = harness();
    let issued_at = Utc::now();

    let session = h
        .manager
        .login_with_sacred_key("Guardian-X", "KEY1")
        .await
        .unwrap();

    assert_eq!(session.session_kind, SessionKind::SacredKey);
    assert!(session.authenticated);
    assert!(!session.is_emergency_session);
    let lifetime = session.expires_at - issued_at;
    assert!(lifetime >= Duration::hours(8) && lifetime < Duration::hours(8) + Duration::minutes(1));
    assert!(!has_ceremonial_authority(Some(&session), "emergency_intervention"));
    assert!(!h.manager.has_ceremonial_authority("emergency_intervention"));
    assert_eq!(h.audit_log.entries_for("login").len(), 1);
}

#[tokio::test]
async fn scenario_b_emergency_login() {
    let h = harness();
    let now = Utc::now();

    let session = h.manager.emergency_login("Guardian-X", "EMKEY").await.unwrap();

    assert!(session.is_emergency_session);
    assert!(has_permission(Some(&session), "emergency_override"));
    assert!(h.manager.has_permission("emergency_override"));
    assert!(h.manager.has_ceremonial_authority("emergency_intervention"));
    assert!(session.expires_at - now <= Duration::hours(2) + Duration::seconds(1));
    assert!(session.expires_at - now > Duration::hours(2) - Duration::minutes(1));
    assert_eq!(h.audit_log.entries_for("emergency_login").len(), 1);
}

#[tokio::test]
async fn scenario_c_wrong_password() {
    let h = harness();

    let err = h
        .manager
        .login("x@guardians.test", "wrong-password")
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert!(err.is_authentication_failure());
    assert_eq!(h.manager.current_session(), None);
    assert!(h.audit_log.entries_for("login").is_empty());
}

#[tokio::test]
async fn scenario_d_second_login_replaces_first() {
    let h = harness();

    h.manager.login("x@guardians.test", "hunter2").await.unwrap();
    let second = h
        .manager
        .login("y@guardians.test", "correct-horse")
        .await
        .unwrap();

    let current = h.manager.current_session().unwrap();
    assert_eq!(current, second);
    assert_eq!(current.subject_name, "Guardian-Y");
    assert_eq!(current.subject_id, Some(subject("g-y")));
    assert_eq!(current.access_level, AccessLevel::Observer);
    assert_eq!(current.specialization, None);
    assert!(current.granted_permissions.is_empty());
    assert!(!h.manager.has_permission("view_metrics"));
}

#[tokio::test]
async fn logout_clears_even_when_invalidation_fails() {
    let h = harness();
    h.manager.login("x@guardians.test", "hunter2").await.unwrap();
    h.directory.set_invalidate_fails(true);
    h.audit_log.set_failing(true);

    h.manager.logout().await;

    assert_eq!(h.manager.current_session(), None);
    assert_eq!(h.manager.state(), SessionState::SignedOut);
    assert_eq!(h.store.load().await, None);
}

#[tokio::test]
async fn failing_credentials_refresh_signs_out() {
    let h = harness();
    h.manager.login("x@guardians.test", "hunter2").await.unwrap();
    h.directory.set_refresh_allowed(false);

    assert!(h.manager.refresh().await.is_err());
    assert_eq!(h.manager.current_session(), None);
    assert!(h.store.raw().is_none());
}

#[tokio::test]
async fn expired_persisted_session_is_not_restored() {
    let h = harness();
    let mut session = h
        .manager
        .login_with_sacred_key("Guardian-X", "KEY1")
        .await
        .unwrap();
    session.expires_at = Utc::now() - Duration::seconds(1);
    h.store.save(&session).await;

    let restarted = SessionManager::new(
        &Collaborators::in_memory(h.directory.clone(), h.audit_log.clone()),
        h.store.clone(),
        SessionLifetimes::default(),
    );

    assert_eq!(restarted.restore().await, None);
    assert_eq!(restarted.current_session(), None);
    assert!(h.store.raw().is_none());
}

#[tokio::test]
async fn session_survives_restart_through_sqlite() {
    let h = harness();
    let store = Arc::new(SqliteSessionStore::connect("sqlite::memory:").await.unwrap());
    let collaborators = Collaborators::in_memory(h.directory.clone(), h.audit_log.clone());

    let first = SessionManager::new(&collaborators, store.clone(), SessionLifetimes::default());
    let session = first.login_with_sacred_key("Guardian-X", "KEY1").await.unwrap();
    drop(first);

    let second = SessionManager::new(&collaborators, store, SessionLifetimes::default());
    assert_eq!(second.restore().await, Some(session));
    assert!(second.has_permission("view_metrics"));
}
