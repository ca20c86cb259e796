//! Debian version ordering
//!
//! Versions have the shape `[epoch:]upstream[-revision]` and are compared
//! with the dpkg algorithm: epochs numerically, then upstream and revision
//! with alternating non-digit/digit runs where `~` sorts before anything,
//! letters sort before other symbols and digit runs compare as numbers.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed Debian package version
///
/// Equality follows the ordering, so `1.0` equals `0:1.00`. The original
/// string is retained for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DebVersion {
    raw: String,
    epoch: u64,
    upstream: String,
    revision: String,
}

impl DebVersion {
    /// Parse a version string
    ///
    /// Parsing is lenient: a non-numeric epoch prefix is kept as part of
    /// the upstream version rather than rejected.
    pub fn parse(input: &str) -> Self {
        let raw = input.trim().to_string();

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
                (epoch.parse::<u64>().unwrap_or(u64::MAX), rest)
            }
            _ => (0, raw.as_str()),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
            raw: raw.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

/// Compare two raw version strings with dpkg ordering
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    DebVersion::parse(a).cmp(&DebVersion::parse(b))
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| verrevcmp(&self.revision, &other.revision))
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for DebVersion {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for DebVersion {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<DebVersion> for String {
    fn from(value: DebVersion) -> Self {
        value.raw
    }
}

/// Sort weight of a single character in the non-digit phase
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn is_digit(c: Option<u8>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit())
}

fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        // Non-digit run
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        // Digit run, leading zeros are insignificant
        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit(a.get(i).copied()) && is_digit(b.get(j).copied()) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if is_digit(a.get(i).copied()) {
            return Ordering::Greater;
        }
        if is_digit(b.get(j).copied()) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}
