use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

const SEPARATOR: char = ':';

/// A status line that could not be turned into a `key: value` pair.
///
/// `index` is the zero-based position of the line in the input text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed status line {index} ({reason}): {line:?}")]
pub struct MalformedStatusLine {
    pub index: usize,
    pub line: String,
    pub reason: &'static str,
}

/// Key/value fields reported by a container-info query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    fields: BTreeMap<String, String>,
}

impl StatusRecord {
    /// Parses `key: value` status text.
    ///
    /// Blank lines are skipped. Every other line must hold exactly one colon
    /// and a key that appears nowhere else in the text. Keys are trimmed, values
    /// lose their leading whitespace only.
    pub fn parse(text: &str) -> Result<Self, MalformedStatusLine> {
        let mut fields = BTreeMap::new();

        for (index, line) in text.split('\n').enumerate() {
            // Skip blank lines.
            if line.trim().is_empty() {
                continue;
            }

            let malformed = |reason| MalformedStatusLine {
                index,
                line: line.to_owned(),
                reason,
            };

            // Split the line around its single separator.
            let mut parts = line.split(SEPARATOR);
            let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => (key.trim(), value.trim_start()),
                (_, None, _) => return Err(malformed("missing separator")),
                _ => return Err(malformed("more than one separator")),
            };
            if key.is_empty() {
                return Err(malformed("empty key"));
            }

            match fields.entry(key.to_owned()) {
                Entry::Occupied(_) => return Err(malformed("duplicate key")),
                Entry::Vacant(entry) => {
                    entry.insert(value.to_owned());
                }
            }
        }

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.fields.iter()
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.fields {
            writeln!(f, "{}: {}", key, value)?;
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a StatusRecord {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lxc_info_output() {
        let record = StatusRecord::parse("State: RUNNING\nIP: 10.0.0.5\n").unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("State"), Some("RUNNING"));
        assert_eq!(record.get("IP"), Some("10.0.0.5"));
    }

    #[test]
    fn skips_blank_lines_and_stray_whitespace() {
        let text = "\n  Name:   t\n\t\n PID:\t4242\n\n";
        let record = StatusRecord::parse(text).unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Name"), Some("t"));
        assert_eq!(record.get("PID"), Some("4242"));
    }

    #[test]
    fn keeps_trailing_whitespace_in_values() {
        let record = StatusRecord::parse("Memory use:   2.5 MiB  \r\n").unwrap();

        assert_eq!(record.get("Memory use"), Some("2.5 MiB  \r"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let record = StatusRecord::parse("IP:\n").unwrap();

        assert_eq!(record.get("IP"), Some(""));
    }

    #[test]
    fn empty_text_parses_to_empty_record() {
        assert!(StatusRecord::parse("").unwrap().is_empty());
        assert!(StatusRecord::parse("\n \n").unwrap().is_empty());
    }

    #[test]
    fn rejects_line_without_separator() {
        let err = StatusRecord::parse("IP 10.0.0.5").unwrap_err();

        assert_eq!(err.index, 0);
        assert_eq!(err.line, "IP 10.0.0.5");
        assert_eq!(err.reason, "missing separator");
    }

    #[test]
    fn rejects_line_with_several_separators() {
        let err = StatusRecord::parse("State: RUNNING\nIP: fe80::1\n").unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.reason, "more than one separator");
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = StatusRecord::parse("IP: 10.0.0.5\n\nIP: 10.0.0.6").unwrap_err();

        assert_eq!(err.index, 2);
        assert_eq!(err.line, "IP: 10.0.0.6");
        assert_eq!(err.reason, "duplicate key");
    }

    #[test]
    fn rejects_empty_key() {
        let err = StatusRecord::parse("  : RUNNING").unwrap_err();

        assert_eq!(err.reason, "empty key");
    }

    #[test]
    fn displays_as_status_text() {
        let record = StatusRecord::parse("State: RUNNING\nIP: 10.0.0.5").unwrap();

        assert_eq!(record.to_string(), "IP: 10.0.0.5\nState: RUNNING\n");
        assert_eq!(StatusRecord::parse(&record.to_string()).unwrap(), record);
    }
}
