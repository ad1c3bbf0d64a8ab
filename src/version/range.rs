//! NuGet version range (interval notation)
//!
//! Supported forms:
//! - `1.0` - minimum 1.0.0 inclusive, no maximum
//! - `[1.0]` - exactly 1.0.0
//! - `[1.0, 2.0)` - 1.0.0 <= v < 2.0.0
//! - `(1.0, )` - v > 1.0.0
//! - `(, 2.0]` - v <= 2.0.0
//! - `(, )` - any version

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::error::VersionError;
use crate::version::nuget::Version;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    pub minimum: Option<Version>,
    pub maximum: Option<Version>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl VersionRange {
    /// `[version, )`
    pub fn at_least(version: Version) -> Self {
        Self {
            minimum: Some(version),
            maximum: None,
            min_inclusive: true,
            max_inclusive: false,
        }
    }

    /// `[lower, upper]`
    pub fn between(lower: Version, upper: Version) -> Self {
        Self {
            minimum: Some(lower),
            maximum: Some(upper),
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(VersionError::range(input, "empty range"));
        }

        let min_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Self::parse_bare(input, text),
        };
        let max_inclusive = match text.chars().last() {
            Some(']') if text.len() > 1 => true,
            Some(')') if text.len() > 1 => false,
            _ => return Err(VersionError::range(input, "missing closing bracket")),
        };

        let inner = &text[1..text.len() - 1];
        if inner.contains(['[', ']', '(', ')']) {
            return Err(VersionError::range(input, "unbalanced brackets"));
        }

        let range = match inner.split_once(',') {
            Some((_, rest)) if rest.contains(',') => {
                return Err(VersionError::range(input, "too many bounds"));
            }
            Some((left, right)) => Self {
                minimum: Self::parse_bound(input, left)?,
                maximum: Self::parse_bound(input, right)?,
                min_inclusive,
                max_inclusive,
            },
            None if min_inclusive && max_inclusive => {
                let exact = Self::parse_bound(input, inner)?
                    .ok_or_else(|| VersionError::range(input, "empty exact version"))?;
                Self::between(exact.clone(), exact)
            }
            None => {
                return Err(VersionError::range(
                    input,
                    "single version must use inclusive brackets",
                ));
            }
        };

        if let (Some(minimum), Some(maximum)) = (&range.minimum, &range.maximum)
            && minimum > maximum
        {
            return Err(VersionError::range(input, "minimum exceeds maximum"));
        }

        Ok(range)
    }

    fn parse_bare(input: &str, text: &str) -> Result<Self, VersionError> {
        if text.contains([',', '[', ']', '(', ')']) {
            return Err(VersionError::range(input, "missing opening bracket"));
        }
        let minimum = Version::parse(text).map_err(|e| VersionError::range(input, e.to_string()))?;
        Ok(Self {
            minimum: Some(minimum),
            maximum: None,
            min_inclusive: true,
            max_inclusive: true,
        })
    }

    fn parse_bound(input: &str, bound: &str) -> Result<Option<Version>, VersionError> {
        let bound = bound.trim();
        if bound.is_empty() {
            return Ok(None);
        }
        Version::parse(bound)
            .map(Some)
            .map_err(|e| VersionError::range(input, e.to_string()))
    }

    /// Membership test; each bound honours its own inclusivity
    pub fn in_range(&self, version: &Version) -> bool {
        if let Some(minimum) = &self.minimum {
            if minimum == version {
                return self.min_inclusive;
            }
            if minimum > version {
                return false;
            }
        }

        if let Some(maximum) = &self.maximum {
            if maximum == version {
                return self.max_inclusive;
            }
            if maximum < version {
                return false;
            }
        }

        true
    }

    /// Version recommended to satisfy both `self` and `other`.
    ///
    /// Starts from the larger inclusive minimum, then lets an inclusive
    /// maximum that does not exceed that candidate pull it down. Without a
    /// usable minimum the smaller inclusive maximum is used. Disjoint ranges
    /// are not detected.
    pub fn common_minimum_version(&self, other: &VersionRange) -> Option<Version> {
        let mut minimum = match (&self.minimum, &other.minimum) {
            (Some(mine), Some(theirs)) => {
                if mine > theirs && self.min_inclusive {
                    Some(mine.clone())
                } else if mine < theirs && other.min_inclusive {
                    Some(theirs.clone())
                } else {
                    None
                }
            }
            (Some(mine), None) if self.min_inclusive => Some(mine.clone()),
            (None, Some(theirs)) if other.min_inclusive => Some(theirs.clone()),
            _ => None,
        };

        if let (Some(mine), Some(theirs)) = (&self.maximum, &other.maximum) {
            match minimum.take() {
                Some(mut candidate) => {
                    if mine <= &candidate && self.max_inclusive {
                        candidate = mine.clone();
                    }
                    if theirs <= &candidate && other.max_inclusive {
                        candidate = theirs.clone();
                    }
                    minimum = Some(candidate);
                }
                None => {
                    if mine < theirs && self.max_inclusive {
                        minimum = Some(mine.clone());
                    } else if mine > theirs && other.max_inclusive {
                        minimum = Some(theirs.clone());
                    }
                }
            }
        }

        minimum
    }

    pub fn is_unbounded(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(minimum), Some(maximum)) = (&self.minimum, &self.maximum)
            && minimum == maximum
            && self.min_inclusive
            && self.max_inclusive
        {
            return write!(f, "[{}]", minimum);
        }

        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        let minimum = self.minimum.as_ref().map(Version::text).unwrap_or("");
        let maximum = self.maximum.as_ref().map(Version::text).unwrap_or("");
        write!(f, "{}{}, {}{}", open, minimum, maximum, close)
    }
}
