// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deployment tier classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The key in the raw environment that selects the deployment tier.
pub const TIER_KEY: &str = "APP_ENV";

/// The deployment environment a process runs in.
///
/// The tier selects which overlay validation rules apply and whether file
/// watching is enabled.
///
/// # Examples
///
/// ```
/// use unicfg::domain::Tier;
///
/// let tier: Tier = "production".parse().unwrap();
/// assert_eq!(tier, Tier::Production);
/// assert_eq!(Tier::default(), Tier::Development);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Local development; enables hot reload
    #[default]
    Development,
    /// Automated test runs
    Test,
    /// Live deployments; strictest rules
    Production,
}

impl Tier {
    /// All tiers, in declaration order.
    pub const ALL: [Tier; 3] = [Tier::Development, Tier::Test, Tier::Production];

    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Development => "development",
            Tier::Test => "test",
            Tier::Production => "production",
        }
    }

    /// Returns `true` for [`Tier::Production`].
    pub fn is_production(&self) -> bool {
        matches!(self, Tier::Production)
    }
}

/// Error returned when a string does not name a known tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier(pub String);

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown tier '{}' (expected development, test or production)",
            self.0
        )
    }
}

impl std::error::Error for UnknownTier {}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Tier::Development),
            "test" => Ok(Tier::Test),
            "production" | "prod" => Ok(Tier::Production),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
