//! Case-insensitive header set for a single message.

use std::collections::HashMap;
use std::num::ParseIntError;

/// Header declaring the exact byte length of the message body.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Header set scoped to one message.
///
/// Names are matched case-insensitively (stored lowercased); values keep
/// their text with surrounding whitespace trimmed. When a name repeats,
/// the last value wins.
///
/// # Example
///
/// ```
/// use framewire::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Length", " 42 ");
/// headers.insert("X-Foo", "bar");
///
/// assert_eq!(headers.get("content-length"), Some("42"));
/// assert_eq!(headers.get("X-FOO"), Some("bar"));
/// assert_eq!(headers.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header. Name and value are trimmed of
    /// surrounding whitespace.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.entries
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check whether a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of distinct headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs. Names are lowercased; order is
    /// unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Remove all entries, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The declared body length, if a `Content-Length` header is present.
    ///
    /// Returns `None` when the header is absent, `Some(Err(_))` when the
    /// value is not a non-negative base-10 integer.
    pub fn content_length(&self) -> Option<std::result::Result<usize, ParseIntError>> {
        self.get(CONTENT_LENGTH).map(|v| v.parse::<usize>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Length", "5");

        assert_eq!(headers.get("Content-Length"), Some("5"));
        assert_eq!(headers.get("content-length"), Some("5"));
        assert_eq!(headers.get("CONTENT-LENGTH"), Some("5"));
        assert!(headers.contains("Content-length"));
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut headers = Headers::new();
        headers.insert("  X-Foo  ", "  bar  ");

        assert_eq!(headers.get("X-Foo"), Some("bar"));
    }

    #[test]
    fn test_last_value_wins_on_repeat() {
        let mut headers = Headers::new();
        headers.insert("X-Foo", "first");
        headers.insert("x-foo", "second");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Foo"), Some("second"));
    }

    #[test]
    fn test_content_length_absent() {
        let headers = Headers::new();
        assert!(headers.content_length().is_none());
    }

    #[test]
    fn test_content_length_valid() {
        let mut headers = Headers::new();
        headers.insert("content-LENGTH", "128");

        assert_eq!(headers.content_length().unwrap().unwrap(), 128);
    }

    #[test]
    fn test_content_length_malformed() {
        let mut headers = Headers::new();
        headers.insert(CONTENT_LENGTH, "abc");
        assert!(headers.content_length().unwrap().is_err());

        headers.insert(CONTENT_LENGTH, "-3");
        assert!(headers.content_length().unwrap().is_err());
    }

    #[test]
    fn test_clear() {
        let mut headers = Headers::new();
        headers.insert("X-Foo", "bar");
        headers.clear();

        assert!(headers.is_empty());
        assert_eq!(headers.get("X-Foo"), None);
    }
}
