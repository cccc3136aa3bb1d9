//! The sandbox/production data partition.
//!
//! Every resource on the Xyno API lives in exactly one environment. The
//! dashboard works in one environment at a time and tags every request with
//! it, so switching the environment switches the data set being viewed.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Data partition selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Test partition. Resources are created here and promoted later.
    #[default]
    Sandbox,
    /// Live partition. Promotion targets this environment.
    Production,
}

impl Environment {
    /// Wire value sent in the `X-Environment` header and kept in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sandbox => "Sandbox",
            Self::Production => "Production",
        }
    }

    /// Lenient parse used when reading persisted state.
    ///
    /// Only the exact value `production` selects production. Anything else,
    /// including a missing value, falls back to sandbox.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Sandbox,
        }
    }

    /// The other environment.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Sandbox => Self::Production,
            Self::Production => Self::Sandbox,
        }
    }

    #[must_use]
    pub const fn is_sandbox(self) -> bool {
        matches!(self, Self::Sandbox)
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            _ => Err(format!("invalid environment: {s} (expected sandbox or production)")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sandbox() {
        assert_eq!(Environment::default(), Environment::Sandbox);
    }

    #[test]
    fn test_from_stored_falls_back_to_sandbox() {
        assert_eq!(
            Environment::from_stored(Some("production")),
            Environment::Production
        );
        assert_eq!(Environment::from_stored(Some("sandbox")), Environment::Sandbox);
        assert_eq!(Environment::from_stored(Some("Production")), Environment::Sandbox);
        assert_eq!(Environment::from_stored(Some("staging")), Environment::Sandbox);
        assert_eq!(Environment::from_stored(None), Environment::Sandbox);
    }

    #[test]
    fn test_from_str_is_strict() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("prod".parse::<Environment>().is_err());
    }

    #[test]
    fn test_toggled() {
        assert_eq!(Environment::Sandbox.toggled(), Environment::Production);
        assert_eq!(Environment::Production.toggled(), Environment::Sandbox);
    }

    #[test]
    fn test_serde_uses_wire_values() {
        assert_eq!(
            serde_json::to_string(&Environment::Production).unwrap(),
            "\"production\""
        );
    }
}
