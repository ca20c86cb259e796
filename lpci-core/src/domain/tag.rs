//! Build tags
//!
//! A build tag marks a commit for which a build was requested. Tags look
//! like `20250510_main` or, for further builds on the same day,
//! `20250510-1_main`, `20250510-2_main`, ...

use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

const DATE_FORMAT: &str = "%Y%m%d";

/// A parsed `<YYYYMMDD>[-<seq>]_<branch>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTag {
    pub date: String,
    pub sequence: Option<u32>,
    pub branch: String,
}

impl BuildTag {
    /// Parse `tag` as a build tag for `branch`
    ///
    /// A sequence too large for a `u32` does not parse.
    pub fn parse(tag: &str, branch: &str) -> Option<Self> {
        let captures = tag_pattern(branch).captures(tag)?;
        let sequence = match captures.get(2) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        Some(Self {
            date: captures.get(1)?.as_str().to_string(),
            sequence,
            branch: branch.to_string(),
        })
    }

    /// `git tag --list` pattern matching every tag `next` has to consider
    pub fn list_pattern(date: NaiveDate, branch: &str) -> String {
        format!("{}*_{}", date.format(DATE_FORMAT), branch)
    }

    /// Mint the next unused tag for `date` given the tags already in the
    /// repository
    ///
    /// The first build of the day gets the bare date; later ones get the
    /// sequence above every sequence already used that day, or the lowest
    /// free one once that would overflow.
    pub fn next(date: NaiveDate, branch: &str, existing: &[String]) -> Self {
        let today = date.format(DATE_FORMAT).to_string();

        let used: BTreeSet<u32> = existing
            .iter()
            .filter_map(|tag| Self::parse(tag, branch))
            .filter(|tag| tag.date == today)
            .map(|tag| tag.sequence.unwrap_or(0))
            .collect();

        let sequence = match used.last() {
            None => None,
            Some(last) => last
                .checked_add(1)
                .or_else(|| (1..u32::MAX).find(|seq| !used.contains(seq))),
        };

        Self {
            date: today,
            sequence,
            branch: branch.to_string(),
        }
    }
}

impl fmt::Display for BuildTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(seq) => write!(f, "{}-{}_{}", self.date, seq, self.branch),
            None => write!(f, "{}_{}", self.date, self.branch),
        }
    }
}

/// Whether `tag` is a build tag of any date for `branch`
pub fn is_build_tag(tag: &str, branch: &str) -> bool {
    BuildTag::parse(tag, branch).is_some()
}

fn tag_pattern(branch: &str) -> Regex {
    let pattern = format!(r"^([0-9]{{8}})(?:-([0-9]+))?_{}$", regex::escape(branch));
    // Both interpolations are fixed or escaped
    Regex::new(&pattern).expect("build tag pattern is valid")
}
