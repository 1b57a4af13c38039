//! Semantic version parsing and comparison.
//!
//! Package selection is driven entirely by version precedence, so the
//! ordering rules live in one place and are implemented exactly as the
//! semver 2.0.0 specification states them: pre-release identifiers compare
//! element-wise (numeric before alphanumeric), a release outranks any of its
//! pre-releases, and build metadata never participates in comparison.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The standard semver grammar.
static SEMVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .expect("semver regex must compile")
});

/// Error produced when a version string does not match the semver grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid semver <{0}>")]
pub struct InvalidVersion(pub String);

/// An immutable semantic version.
///
/// Equality and hashing ignore build metadata, consistent with the ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemVer {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
    build: Option<String>,
}

impl SemVer {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string, failing with [`InvalidVersion`] when the text
    /// does not match the grammar.
    pub fn parse(text: &str) -> Result<Self, InvalidVersion> {
        let caps = SEMVER_RE
            .captures(text)
            .ok_or_else(|| InvalidVersion(text.to_string()))?;

        // the numeric components already matched `0|[1-9]\d*`; an overflow of
        // u64 is the only way the conversion can fail
        let component = |idx: usize| -> Result<u64, InvalidVersion> {
            caps[idx]
                .parse::<u64>()
                .map_err(|_| InvalidVersion(text.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn with_prerelease(mut self, prerelease: &str) -> Self {
        self.prerelease = Some(prerelease.to_string());
        self
    }

    pub fn with_build(mut self, build: &str) -> Self {
        self.build = Some(build.to_string());
        self
    }
}

impl FromStr for SemVer {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SemVer {
    type Error = InvalidVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SemVer> for String {
    fn from(value: SemVer) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl PartialEq for SemVer {
    fn eq(&self, other: &Self) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.prerelease == other.prerelease
    }
}

impl Eq for SemVer {}

impl Hash for SemVer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.prerelease.hash(state);
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        let core = (self.major, self.minor, self.patch).cmp(&(
            other.major,
            other.minor,
            other.patch,
        ));
        if core != Ordering::Equal {
            return core;
        }

        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            // a version without a pre-release outranks one with it
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(lhs), Some(rhs)) => compare_prerelease(lhs, rhs),
        }
    }
}

/// Element-wise comparison of dot-separated pre-release identifiers.
fn compare_prerelease(lhs: &str, rhs: &str) -> Ordering {
    let mut lhs_segments = lhs.split('.');
    let mut rhs_segments = rhs.split('.');

    loop {
        match (lhs_segments.next(), rhs_segments.next()) {
            (None, None) => return Ordering::Equal,
            // the shorter pre-release is smaller when its prefix matches
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_identifier(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_identifier(lhs: &str, rhs: &str) -> Ordering {
    let lhs_numeric = lhs.bytes().all(|b| b.is_ascii_digit());
    let rhs_numeric = rhs.bytes().all(|b| b.is_ascii_digit());

    match (lhs_numeric, rhs_numeric) {
        // the grammar forbids leading zeroes in numeric identifiers, so
        // shorter digit strings are numerically smaller
        (true, true) => lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => lhs.as_bytes().cmp(rhs.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(text: &str) -> SemVer {
        SemVer::parse(text).unwrap()
    }

    #[test]
    fn parse_plain_version() {
        let ver = v("1.2.3");
        assert_eq!(ver.major(), 1);
        assert_eq!(ver.minor(), 2);
        assert_eq!(ver.patch(), 3);
        assert_eq!(ver.prerelease(), None);
        assert_eq!(ver.build(), None);
    }

    #[test]
    fn parse_full_version() {
        let ver = v("1.0.0-alpha.1+build.42");
        assert_eq!(ver.prerelease(), Some("alpha.1"));
        assert_eq!(ver.build(), Some("build.42"));
    }

    #[test]
    fn format_round_trips() {
        for text in [
            "0.0.0",
            "1.2.3",
            "10.20.30",
            "1.0.0-alpha",
            "1.0.0-alpha.beta.2",
            "1.0.0+exp.sha.5114f85",
            "2.1.0-rc.1+build.9",
        ] {
            assert_eq!(v(text).to_string(), text);
            assert_eq!(v(&v(text).to_string()), v(text));
        }
    }

    #[test]
    fn rejects_invalid_text() {
        for text in [
            "",
            "1",
            "1.2",
            "1.2.3.4",
            "01.0.0",
            "1.00.0",
            "1.0.0-",
            "1.0.0-alpha..1",
            "1.0.0-01",
            "1.0.0+",
            "v1.2.3",
            "1.2.3 ",
        ] {
            assert!(SemVer::parse(text).is_err(), "should reject <{}>", text);
        }
    }

    #[test]
    fn core_components_order() {
        assert!(v("1.0.0") < v("2.0.0"));
        assert!(v("2.0.0") < v("2.1.0"));
        assert!(v("2.1.0") < v("2.1.1"));
        // minor/patch do not outweigh a higher major
        assert!(v("1.99.99") < v("2.0.0"));
    }

    #[test]
    fn prerelease_precedence_chain() {
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];

        for pair in chain.windows(2) {
            assert!(
                v(pair[0]) < v(pair[1]),
                "expected {} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn numeric_identifiers_compare_numerically() {
        assert!(v("1.0.0-2") < v("1.0.0-11"));
        assert!(v("1.0.0-9") < v("1.0.0-10"));
    }

    #[test]
    fn numeric_is_less_than_alphanumeric() {
        assert!(v("1.0.0-999") < v("1.0.0-1a"));
        assert!(v("1.0.0-1") < v("1.0.0-alpha"));
    }

    #[test]
    fn shorter_prerelease_is_smaller() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.0"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.1.1"));
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
        assert_eq!(v("1.0.0+a").cmp(&v("1.0.0+b")), Ordering::Equal);
        assert_eq!(v("1.0.0-rc.1+a"), v("1.0.0-rc.1"));
    }

    #[test]
    fn ordering_is_antisymmetric_and_total() {
        let versions = [
            v("0.1.0"),
            v("1.0.0-alpha"),
            v("1.0.0-alpha.1"),
            v("1.0.0"),
            v("1.0.1"),
            v("2.0.0-rc.2"),
        ];

        for a in &versions {
            for b in &versions {
                match a.cmp(b) {
                    Ordering::Less => assert_eq!(b.cmp(a), Ordering::Greater),
                    Ordering::Greater => assert_eq!(b.cmp(a), Ordering::Less),
                    Ordering::Equal => assert_eq!(a, b),
                }
            }
        }
    }

    #[test]
    fn ordering_is_transitive_over_sorted_chain() {
        let mut versions = vec![
            v("1.0.0"),
            v("1.0.0-alpha"),
            v("0.9.9"),
            v("1.0.0-beta.11"),
            v("1.0.0-beta.2"),
            v("1.0.1"),
        ];
        versions.sort();

        for window in versions.windows(3) {
            assert!(window[0] <= window[1]);
            assert!(window[1] <= window[2]);
            assert!(window[0] <= window[2]);
        }
    }

    #[test]
    fn serde_round_trip_as_string() {
        let ver = v("1.4.2-rc.3+nightly");
        let json = serde_json::to_string(&ver).unwrap();
        assert_eq!(json, "\"1.4.2-rc.3+nightly\"");
        let back: SemVer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ver);
    }
}
