//! HTS classification numbers.
//!
//! Everything here works on the canonical digit string produced by
//! [`normalize`]; display, hierarchy and lookups are slices of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_DIGITS: usize = 4;
pub const MAX_DIGITS: usize = 10;

/// Dot positions for the 4.2.2.2 display grouping.
const GROUP_BREAKS: [usize; 3] = [4, 6, 8];

/// Strips everything but digits, then right-pads to four digits.
///
/// An empty input stays empty so that [`validate`] can report it as such.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    while digits.len() < MIN_DIGITS {
        digits.push('0');
    }
    digits
}

pub fn validate(raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    // Padding would otherwise turn "n/a" into "0000".
    if !raw.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::NonNumeric {
            raw: raw.to_string(),
        });
    }

    let normalized = normalize(raw);
    // Unreachable while normalize pads to MIN_DIGITS.
    if normalized.len() < MIN_DIGITS {
        return Err(ValidationError::TooShort {
            digits: normalized.len(),
        });
    }
    if normalized.len() > MAX_DIGITS {
        return Err(ValidationError::TooLong {
            digits: normalized.len(),
        });
    }
    if !normalized.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::NonNumeric {
            raw: raw.to_string(),
        });
    }

    Ok(())
}

/// Display form: `XXXX`, `XXXX.XX`, `XXXX.XX.XX` or `XXXX.XX.XX.XX`.
///
/// A trailing partial group keeps exactly the digits present and anything
/// past the tenth digit stays in the last group, so stripping the dots
/// always gives back [`normalize`]'s output.
pub fn format(raw: &str) -> String {
    let digits = normalize(raw);
    let mut out = String::with_capacity(digits.len() + GROUP_BREAKS.len());
    let mut start = 0;

    for end in GROUP_BREAKS {
        if digits.len() <= end {
            break;
        }
        out.push_str(&digits[start..end]);
        out.push('.');
        start = end;
    }
    out.push_str(&digits[start..]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtsHierarchy {
    pub original: String,
    pub normalized: String,
    pub formatted: String,
    pub chapter: Option<String>,
    pub heading: Option<String>,
    pub subheading: Option<String>,
    pub tariff_item: Option<String>,
    pub statistical_suffix: Option<String>,
}

pub fn hierarchy(raw: &str) -> HtsHierarchy {
    let normalized = normalize(raw);
    let prefix = |len: usize| (normalized.len() >= len).then(|| normalized[..len].to_string());

    HtsHierarchy {
        original: raw.to_string(),
        formatted: format(raw),
        chapter: prefix(2),
        heading: prefix(4),
        subheading: prefix(6),
        tariff_item: prefix(8),
        statistical_suffix: (normalized.len() >= 10).then(|| normalized[8..10].to_string()),
        normalized,
    }
}

/// A validated, normalized HTS number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HtsNumber(String);

impl HtsNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate(raw)?;
        Ok(Self(normalize(raw)))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }

    pub fn display(&self) -> String {
        format(&self.0)
    }

    pub fn hierarchy(&self) -> HtsHierarchy {
        hierarchy(&self.0)
    }

    pub fn chapter(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for HtsNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for HtsNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HtsNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HtsNumber> for String {
    fn from(value: HtsNumber) -> Self {
        value.0
    }
}
