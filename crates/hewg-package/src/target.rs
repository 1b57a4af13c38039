//! Target triplets.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::IdentityError;

static TRIPLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]+)-([A-Za-z0-9]+)-([A-Za-z0-9]+)$").expect("triplet regex")
});

/// An `architecture-os-vendor` build target tag.
///
/// Triplets are compared textually; no alias table exists, so
/// `x86_64-linux-gnu` and `x86-linux-gnu` are distinct targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetTriplet {
    architecture: String,
    os: String,
    vendor: String,
}

impl TargetTriplet {
    pub fn new(architecture: &str, os: &str, vendor: &str) -> Result<Self, IdentityError> {
        Self::parse(&format!("{architecture}-{os}-{vendor}"))
    }

    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let caps = TRIPLET_RE
            .captures(text)
            .ok_or_else(|| IdentityError::InvalidTarget(text.to_string()))?;

        Ok(Self {
            architecture: caps[1].to_string(),
            os: caps[2].to_string(),
            vendor: caps[3].to_string(),
        })
    }

    /// The triplet builds are made for when none is requested.
    pub fn host() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "linux".to_string(),
            vendor: "gnu".to_string(),
        }
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }
}

impl FromStr for TargetTriplet {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TargetTriplet {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetTriplet> for String {
    fn from(value: TargetTriplet) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TargetTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.architecture, self.os, self.vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_and_formats() {
        let triplet = TargetTriplet::parse("x86-linux-gnu").unwrap();
        assert_eq!(triplet.architecture(), "x86");
        assert_eq!(triplet.os(), "linux");
        assert_eq!(triplet.vendor(), "gnu");
        assert_eq!(triplet.to_string(), "x86-linux-gnu");
    }

    #[test]
    fn rejects_bad_shapes() {
        for text in [
            "",
            "x86",
            "x86-linux",
            "x86-linux-gnu-extra",
            "x86_64-linux-gnu",
            "x86--gnu",
            "x86-linux-",
        ] {
            assert!(TargetTriplet::parse(text).is_err(), "should reject <{text}>");
        }
    }

    #[test]
    fn textual_ordering() {
        let a = TargetTriplet::parse("arm-linux-gnu").unwrap();
        let b = TargetTriplet::parse("x86-linux-gnu").unwrap();
        assert!(a < b);
    }
}
