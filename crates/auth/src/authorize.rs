use serde::Serialize;

use crate::{Permission, SessionRecord};

/// Whether the session grants `name`.
///
/// - No IO
/// - No panics
/// - No caching (safe to call on every render or request)
///
/// A granted `"all_systems"` flag satisfies every check.
pub fn has_permission(session: Option<&SessionRecord>, name: &str) -> bool {
    let Some(session) = session else {
        return false;
    };
    session.granted_permissions.is_granted(name) || session.granted_permissions.has_wildcard()
}

/// Whether the session holds the ceremonial authority `name` (exact match).
pub fn has_ceremonial_authority(session: Option<&SessionRecord>, name: &str) -> bool {
    session.is_some_and(|s| s.holds_authority(name))
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a permission decision.
///
/// Answers "why can (or can't) this guardian do X?" for audit screens and
/// debugging without changing the decision itself.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionExplanation {
    /// The permission that was being checked.
    pub required_permission: String,

    /// Whether the permission was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Flags currently granted to the session (sorted).
    pub effective_permissions: Vec<String>,

    pub has_wildcard: bool,

    /// Catalog description of the permission, when it is a known one.
    pub description: Option<&'static str>,

    /// If denied, this explains what was missing.
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoSession,
    MissingPermission,
}

/// Explain why [`has_permission`] answers the way it does.
pub fn explain_permission(session: Option<&SessionRecord>, name: &str) -> PermissionExplanation {
    let description = Permission::new(name.to_string()).description();

    let Some(session) = session else {
        return PermissionExplanation {
            required_permission: name.to_string(),
            granted: false,
            reason: "No active guardian session".to_string(),
            effective_permissions: Vec::new(),
            has_wildcard: false,
            description,
            denial: Some(DenialKind::NoSession),
        };
    };

    let perms = &session.granted_permissions;
    let effective_permissions: Vec<String> =
        perms.granted().map(|p| p.as_str().to_string()).collect();
    let has_wildcard = perms.has_wildcard();

    let (granted, reason, denial) = if perms.is_granted(name) {
        (true, format!("Session grants '{name}' explicitly"), None)
    } else if has_wildcard {
        (
            true,
            format!("Session holds wildcard '{}'", Permission::ALL_SYSTEMS),
            None,
        )
    } else {
        (
            false,
            format!(
                "Session for '{}' does not grant '{}'. Current permissions: {:?}",
                session.subject_name, name, effective_permissions
            ),
            Some(DenialKind::MissingPermission),
        )
    };

    PermissionExplanation {
        required_permission: name.to_string(),
        granted,
        reason,
        effective_permissions,
        has_wildcard,
        description,
        denial,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::{AccessLevel, GuardianProfile, PermissionSet, SessionKind, SessionLifetimes};

    fn session_with(perms: PermissionSet) -> SessionRecord {
        SessionRecord::issue(
            SessionKind::Credentials,
            "Guardian-X",
            None,
            GuardianProfile::new(AccessLevel::Analyst)
                .with_permissions(perms)
                .with_authority("archive_seal"),
            &SessionLifetimes::default(),
            Utc::now(),
        )
    }

    #[test]
    fn no_session_denies_everything() {
        assert!(!has_permission(None, "view_metrics"));
        assert!(!has_ceremonial_authority(None, "archive_seal"));

        let explanation = explain_permission(None, "view_metrics");
        assert!(!explanation.granted);
        assert_eq!(explanation.denial, Some(DenialKind::NoSession));
    }

    #[test]
    fn explicit_grant_and_denial() {
        let session = session_with(PermissionSet::granting(["view_metrics"]));
        assert!(has_permission(Some(&session), "view_metrics"));
        assert!(!has_permission(Some(&session), "value_allocation"));

        let explanation = explain_permission(Some(&session), "value_allocation");
        assert!(!explanation.granted);
        assert_eq!(explanation.denial, Some(DenialKind::MissingPermission));
        assert_eq!(explanation.effective_permissions, vec!["view_metrics".to_string()]);
        assert!(explanation.description.is_some());
    }

    #[test]
    fn authorities_are_exact_matches() {
        let session = session_with(PermissionSet::granting(["all_systems"]));
        assert!(has_ceremonial_authority(Some(&session), "archive_seal"));
        assert!(!has_ceremonial_authority(Some(&session), "archive"));
        // The permission wildcard does not extend to authorities.
        assert!(!has_ceremonial_authority(Some(&session), "emergency_intervention"));
    }

    #[test]
    fn wildcard_explanation_mentions_all_systems() {
        let session = session_with(PermissionSet::granting(["all_systems"]));
        let explanation = explain_permission(Some(&session), "dispute_resolution");
        assert!(explanation.granted);
        assert!(explanation.has_wildcard);
        assert!(explanation.reason.contains("all_systems"), "got: {}", explanation.reason);
    }

    proptest! {
        /// Property: a session granted `all_systems` passes every permission check.
        #[test]
        fn all_systems_grants_any_permission(
            name in "[a-z_]{1,24}",
            extra in prop::collection::vec(("[a-z_]{1,12}", any::<bool>()), 0..8),
        ) {
            let mut perms: PermissionSet = extra
                .into_iter()
                .map(|(n, granted)| (Permission::new(n), granted))
                .collect();
            perms.grant(Permission::ALL_SYSTEMS);
            let session = session_with(perms);

            prop_assert!(has_permission(Some(&session), "all_systems"));
            prop_assert!(has_permission(Some(&session), &name));
        }
    }
}
