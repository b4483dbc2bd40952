//! Request types passed across the engine boundary

use serde::{Deserialize, Serialize};

/// Inclusive key range for a collection scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// First key to include; `None` scans from the beginning
    pub start: Option<String>,

    /// Last key to include; `None` scans to the end
    pub end: Option<String>,

    /// Every key in the range starts with this; the scan stops at the
    /// first key past `start` that does not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl KeyRange {
    /// Range covering every key
    pub fn all() -> Self {
        Self::default()
    }

    /// Range between two keys, both inclusive
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
            prefix: None,
        }
    }

    /// Keys starting with `prefix`, whatever bytes follow it
    pub fn prefix(prefix: &str) -> Self {
        Self {
            start: Some(prefix.to_string()),
            end: None,
            prefix: Some(prefix.to_string()),
        }
    }

    /// Check whether a key falls inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = self.start.as_ref().is_none_or(|s| key >= s.as_bytes());
        let before_end = self.end.as_ref().is_none_or(|e| key <= e.as_bytes());
        let in_prefix = self.prefix.as_ref().is_none_or(|p| key.starts_with(p.as_bytes()));
        after_start && before_end && in_prefix
    }
}

/// A validated page request; both fields are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_NUMBER: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    /// Build a request, replacing non-positive arguments with the given
    /// defaults. The flag reports whether anything was replaced.
    pub fn coerce(page_number: i64, page_size: i64, defaults: PageRequest) -> (Self, bool) {
        let mut coerced = false;
        let mut pick = |requested: i64, default: u32| {
            if requested < 1 {
                coerced = true;
                default
            } else {
                u32::try_from(requested).unwrap_or(u32::MAX)
            }
        };

        let request = Self {
            page_number: pick(page_number, defaults.page_number),
            page_size: pick(page_size, defaults.page_size),
        };
        (request, coerced)
    }

    /// Zero-based offset of the first record on this page
    pub fn offset(&self) -> u64 {
        (self.page_number.max(1) as u64 - 1) * self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: Self::DEFAULT_PAGE_NUMBER,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_range_contains() {
        let range = KeyRange::prefix("page_user:");
        assert!(range.contains(b"page_user:00"));
        assert!(range.contains(b"page_user:24"));
        assert!(!range.contains(b"other:00"));
        assert!(!range.contains(b"zzz"));

        assert!(KeyRange::all().contains(b""));
    }

    #[test]
    fn test_prefix_admits_any_continuation() {
        let range = KeyRange::prefix("user:");
        assert!(range.contains("user:émile".as_bytes()));
        assert!(range.contains(b"user:~x"));
        assert!(range.contains(b"user:\xff"));
        assert!(range.contains(b"user:"));
        assert!(!range.contains(b"user"));
        assert!(!range.contains(b"user;"));
    }

    #[test]
    fn test_page_request_coercion() {
        let defaults = PageRequest::default();

        let (req, coerced) = PageRequest::coerce(3, 10, defaults);
        assert_eq!(req, PageRequest { page_number: 3, page_size: 10 });
        assert!(!coerced);

        let (req, coerced) = PageRequest::coerce(0, -5, defaults);
        assert_eq!(req, PageRequest { page_number: 1, page_size: 50 });
        assert!(coerced);

        let (req, _) = PageRequest::coerce(i64::MAX, 1, defaults);
        assert_eq!(req.page_number, u32::MAX);
    }

    #[test]
    fn test_page_offset() {
        let req = PageRequest { page_number: 3, page_size: 10 };
        assert_eq!(req.offset(), 20);
        assert_eq!(PageRequest::default().offset(), 0);
    }
}
