use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque feature-flag names (e.g. "ethics_review").
/// The special flag `"all_systems"` acts as a wildcard: when granted it
/// satisfies any individual permission check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ALL_SYSTEMS: Permission = Permission(Cow::Borrowed("all_systems"));
    pub const EMERGENCY_OVERRIDE: Permission = Permission(Cow::Borrowed("emergency_override"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::ALL_SYSTEMS.as_str()
    }

    /// Whether the name appears in the known-permission catalog.
    ///
    /// Unknown names are still honoured; this only drives diagnostics.
    pub fn is_known(&self) -> bool {
        describe(self.as_str()).is_some()
    }

    pub fn description(&self) -> Option<&'static str> {
        describe(self.as_str())
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// Catalog of permission flags the dashboard defines.
pub const KNOWN_PERMISSIONS: &[(&str, &str)] = &[
    ("all_systems", "Wildcard - satisfies every permission check"),
    ("emergency_override", "Break-glass access granted to emergency sessions"),
    ("view_metrics", "Read regional and system metrics"),
    ("ethics_review", "Review and annotate ethics threshold breaches"),
    ("dispute_resolution", "Open, arbitrate and close dispute cases"),
    ("value_allocation", "Move value between subjects and pools"),
    ("guardian_management", "Create, suspend and promote guardians"),
    ("system_configuration", "Change system-wide configuration"),
];

fn describe(name: &str) -> Option<&'static str> {
    KNOWN_PERMISSIONS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, description)| *description)
}

/// Boolean feature flags granted to a session.
///
/// Serialized as a plain `{"name": bool}` map, which is the shape the
/// identity store hands out. A flag set to `false` is carried but never grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<Permission, bool>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set where every listed flag is granted.
    pub fn granting<P: Into<Permission>>(permissions: impl IntoIterator<Item = P>) -> Self {
        let mut set = Self::new();
        for permission in permissions {
            set.grant(permission);
        }
        set
    }

    pub fn grant(&mut self, permission: impl Into<Permission>) {
        self.0.insert(permission.into(), true);
    }

    pub fn revoke(&mut self, permission: impl Into<Permission>) {
        self.0.insert(permission.into(), false);
    }

    /// Exact check of a single flag (no wildcard expansion).
    pub fn is_granted(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn has_wildcard(&self) -> bool {
        self.is_granted(Permission::ALL_SYSTEMS.as_str())
    }

    /// Names of every flag currently set to `true`, in sorted order.
    pub fn granted(&self) -> impl Iterator<Item = &Permission> {
        self.0
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(permission, _)| permission)
    }

    pub fn unknown(&self) -> impl Iterator<Item = &Permission> {
        self.0.keys().filter(|permission| !permission.is_known())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<Permission>> FromIterator<(P, bool)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (P, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(p, granted)| (p.into(), granted)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_flags_do_not_grant() {
        let set: PermissionSet = [("view_metrics", true), ("ethics_review", false)]
            .into_iter()
            .collect();

        assert!(set.is_granted("view_metrics"));
        assert!(!set.is_granted("ethics_review"));
        assert!(!set.is_granted("dispute_resolution"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.granted().count(), 1);
    }

    #[test]
    fn wildcard_detection() {
        let mut set = PermissionSet::new();
        assert!(!set.has_wildcard());
        set.grant(Permission::ALL_SYSTEMS);
        assert!(set.has_wildcard());
        set.revoke(Permission::ALL_SYSTEMS);
        assert!(!set.has_wildcard());
    }

    #[test]
    fn unknown_permissions_pass_through() {
        let set = PermissionSet::granting(["view_metrics", "lunar_calibration"]);
        let unknown: Vec<_> = set.unknown().map(Permission::as_str).collect();
        assert_eq!(unknown, vec!["lunar_calibration"]);
        assert!(set.is_granted("lunar_calibration"));
    }

    #[test]
    fn serializes_as_flag_map() {
        let set: PermissionSet = [("all_systems", true)].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "all_systems": true }));

        let parsed: PermissionSet =
            serde_json::from_value(serde_json::json!({ "a": true, "b": false })).unwrap();
        assert!(parsed.is_granted("a"));
        assert!(!parsed.is_granted("b"));
    }
}
