//! Package index parsing
//!
//! Reads `Packages` documents: deb822 paragraphs separated by blank lines,
//! one `Field: value` per line, with continuation lines starting with a
//! space or tab. Only `Package` and `Version` are extracted.

use std::io::BufRead;

use crate::error::Result;

/// The fields of one package paragraph that matter for version tracking
///
/// Either field is empty when the paragraph does not carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRecord {
    pub package: String,
    pub version: String,
}

/// Iterator over the paragraphs of a package index
pub struct PackageIndexReader<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> PackageIndexReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn next_paragraph(&mut self) -> Result<Option<PackageRecord>> {
        let mut record = PackageRecord::default();
        let mut seen_field = false;

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                return Ok(seen_field.then_some(record));
            }

            let line = self.line.trim_end_matches(['\n', '\r']);

            if line.trim().is_empty() {
                if seen_field {
                    return Ok(Some(record));
                }
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            seen_field = true;

            if key.eq_ignore_ascii_case("Package") {
                record.package = value.trim().to_string();
            } else if key.eq_ignore_ascii_case("Version") {
                record.version = value.trim().to_string();
            }
        }
    }
}

impl<R: BufRead> Iterator for PackageIndexReader<R> {
    type Item = Result<PackageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_paragraph() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
