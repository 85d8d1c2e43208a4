use core::str::FromStr;

use serde::{Deserialize, Serialize};

use guardian_core::DomainError;

/// Ordered trust tier of a guardian.
///
/// Higher tiers are expected to hold a superset of lower-tier capability, but
/// the tier is only used for display and coarse routing. Fine-grained checks
/// always go through the granted permissions and authorities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Observer,
    Analyst,
    Curator,
    Overseer,
    SacredKeeper,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 5] = [
        AccessLevel::Observer,
        AccessLevel::Analyst,
        AccessLevel::Curator,
        AccessLevel::Overseer,
        AccessLevel::SacredKeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Observer => "observer",
            AccessLevel::Analyst => "analyst",
            AccessLevel::Curator => "curator",
            AccessLevel::Overseer => "overseer",
            AccessLevel::SacredKeeper => "sacred_keeper",
        }
    }

    pub fn at_least(&self, other: AccessLevel) -> bool {
        *self >= other
    }
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown access level '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(AccessLevel::SacredKeeper > AccessLevel::Overseer);
        assert!(AccessLevel::Curator.at_least(AccessLevel::Analyst));
        assert!(!AccessLevel::Observer.at_least(AccessLevel::Analyst));
    }

    #[test]
    fn parses_wire_names() {
        for level in AccessLevel::ALL {
            assert_eq!(level.as_str().parse::<AccessLevel>().unwrap(), level);
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
        assert!("archon".parse::<AccessLevel>().is_err());
    }
}
