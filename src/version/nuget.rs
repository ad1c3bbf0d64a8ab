//! NuGet package version
//!
//! Grammar: `major.minor[.patch][(-|+)release]`, the release suffix starting
//! at the first `-` or `+`
//! - `1.2` -> 1.2.0
//! - `1.2.3-beta.1` -> release suffix `-beta.1`
//! - `1.2.3+build` -> release suffix `+build`
//! - `1.2.3.4` (legacy four-part) -> release suffix `.4`
//!
//! Ordering only looks at the numeric triple. Two versions with the same
//! triple but different release suffixes are incomparable.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::error::VersionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release/build suffix including its leading delimiter
    pub release: Option<String>,
    text: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64, release: Option<String>) -> Self {
        let text = format!(
            "{}.{}.{}{}",
            major,
            minor,
            patch,
            release.as_deref().unwrap_or("")
        );
        Self {
            major,
            minor,
            patch,
            release,
            text,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::version(input, "empty version"));
        }

        let (numbers, mut release) = match trimmed.find(['-', '+']) {
            Some(pos) => (&trimmed[..pos], Some(trimmed[pos..].to_string())),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() < 2 {
            return Err(VersionError::version(
                input,
                "expected at least major.minor",
            ));
        }
        if parts.len() > 4 {
            return Err(VersionError::version(input, "too many numeric components"));
        }

        let component = |part: &str| -> Result<u64, VersionError> {
            part.parse::<u64>()
                .map_err(|_| VersionError::version(input, format!("'{}' is not a number", part)))
        };

        let major = component(parts[0])?;
        let minor = component(parts[1])?;
        let patch = match parts.get(2) {
            Some(part) => component(part)?,
            None => 0,
        };
        if let Some(revision) = parts.get(3) {
            component(revision)?;
            release = Some(format!(".{}{}", revision, release.unwrap_or_default()));
        }

        Ok(Self::new(major, minor, patch, release))
    }

    /// Canonical text, e.g. `1.2.0-beta`
    pub fn text(&self) -> &str {
        &self.text
    }

    fn numeric(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.text
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.numeric().cmp(&other.numeric()) {
            Ordering::Equal if self == other => Some(Ordering::Equal),
            Ordering::Equal => None,
            ordering => Some(ordering),
        }
    }
}
