//! Package and dependency identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use hewg_semver::SemVer;

use crate::{IdentityError, TargetTriplet};

static ORG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("org regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("name regex"));

/// A fully-qualified package instance: `org.name-version:target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageIdentifier {
    org: String,
    name: String,
    version: SemVer,
    target: TargetTriplet,
}

impl PackageIdentifier {
    pub fn new(
        org: &str,
        name: &str,
        version: SemVer,
        target: TargetTriplet,
    ) -> Result<Self, IdentityError> {
        if !ORG_RE.is_match(org) || !NAME_RE.is_match(name) {
            return Err(IdentityError::InvalidIdentifier(format!(
                "{org}.{name}-{version}:{target}"
            )));
        }

        Ok(Self {
            org: org.to_string(),
            name: name.to_string(),
            version,
            target,
        })
    }

    /// Parse the strict textual form; the target is mandatory.
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let (org, name, version, target) = split_identifier(text)?;
        let target =
            target.ok_or_else(|| IdentityError::InvalidIdentifier(text.to_string()))?;
        Self::new(org, name, version, target)
    }

    /// Parse the textual form, substituting `host` when the target is
    /// omitted.
    pub fn parse_optional_target(text: &str, host: &TargetTriplet) -> Result<Self, IdentityError> {
        let (org, name, version, target) = split_identifier(text)?;
        Self::new(org, name, version, target.unwrap_or_else(|| host.clone()))
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &SemVer {
        &self.version
    }

    pub fn target(&self) -> &TargetTriplet {
        &self.target
    }

    /// True when the two identifiers name the same package line on the same
    /// target, irrespective of version.
    pub fn same_line(&self, other: &Self) -> bool {
        self.org == other.org && self.name == other.name && self.target == other.target
    }
}

fn split_identifier(
    text: &str,
) -> Result<(&str, &str, SemVer, Option<TargetTriplet>), IdentityError> {
    let bad = || IdentityError::InvalidIdentifier(text.to_string());

    let (head, target) = match text.split_once(':') {
        Some((head, target)) => (head, Some(TargetTriplet::parse(target)?)),
        None => (text, None),
    };

    let (org, rest) = head.split_once('.').ok_or_else(bad)?;
    let (name, version) = rest.split_once('-').ok_or_else(bad)?;

    if !ORG_RE.is_match(org) || !NAME_RE.is_match(name) {
        return Err(bad());
    }

    Ok((org, name, SemVer::parse(version)?, target))
}

impl FromStr for PackageIdentifier {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageIdentifier {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageIdentifier> for String {
    fn from(value: PackageIdentifier) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}-{}:{}",
            self.org, self.name, self.version, self.target
        )
    }
}

impl PartialOrd for PackageIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.org, &self.name)
            .cmp(&(&other.org, &other.name))
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.target.cmp(&other.target))
    }
}

/// How a dependency request selects among installed versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    /// Only the exact requested version satisfies the request.
    Exact,
    /// The greatest installed version `>=` the requested one, within the
    /// same major, satisfies the request.
    ThisOrBetter,
}

impl DependencyKind {
    fn prefix(self) -> &'static str {
        match self {
            DependencyKind::Exact => "=",
            DependencyKind::ThisOrBetter => ">=",
        }
    }
}

/// A declared dependency: an operator plus a package identifier whose target
/// may be omitted in source text. The resolver substitutes the current
/// build's target for an omitted one, so the declared form is preserved
/// verbatim in installed manifests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyIdentifier {
    kind: DependencyKind,
    org: String,
    name: String,
    version: SemVer,
    target: Option<TargetTriplet>,
}

impl DependencyIdentifier {
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        // `>=` must be tested before `=`
        let (kind, rest) = if let Some(rest) = text.strip_prefix(">=") {
            (DependencyKind::ThisOrBetter, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (DependencyKind::Exact, rest)
        } else {
            return Err(IdentityError::InvalidDependency(text.to_string()));
        };

        let (org, name, version, target) = split_identifier(rest)?;

        Ok(Self {
            kind,
            org: org.to_string(),
            name: name.to_string(),
            version,
            target,
        })
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &SemVer {
        &self.version
    }

    pub fn target(&self) -> Option<&TargetTriplet> {
        self.target.as_ref()
    }

    /// The target this request binds to under the given build target.
    pub fn target_or<'a>(&'a self, build_target: &'a TargetTriplet) -> &'a TargetTriplet {
        self.target.as_ref().unwrap_or(build_target)
    }

    /// True when `installed` is a candidate for this request: same org, name
    /// and target, and the same major version.
    pub fn admits(&self, installed: &PackageIdentifier, build_target: &TargetTriplet) -> bool {
        installed.org() == self.org
            && installed.name() == self.name
            && installed.target() == self.target_or(build_target)
            && installed.version().major() == self.version.major()
    }
}

impl FromStr for DependencyIdentifier {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DependencyIdentifier {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DependencyIdentifier> for String {
    fn from(value: DependencyIdentifier) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DependencyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}-{}",
            self.kind.prefix(),
            self.org,
            self.name,
            self.version
        )?;
        if let Some(target) = &self.target {
            write!(f, ":{}", target)?;
        }
        Ok(())
    }
}
