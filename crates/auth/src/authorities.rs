use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A named ceremonial authority a session may invoke.
///
/// Unlike permissions these are not boolean flags: a session either holds the
/// authority or it does not, and checks are exact name matches. There is no
/// wildcard authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CeremonialAuthority(Cow<'static, str>);

impl CeremonialAuthority {
    pub const EMERGENCY_INTERVENTION: CeremonialAuthority =
        CeremonialAuthority(Cow::Borrowed("emergency_intervention"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CeremonialAuthority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CeremonialAuthority {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}
