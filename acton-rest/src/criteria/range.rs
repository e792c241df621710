//! `Content-Range` reporting for list responses

use std::fmt;

/// The slice of matching rows a list returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Offset of the first row
    pub start: u64,
    /// Offset of the last row
    pub end: u64,
    /// Total matching rows
    pub total: u64,
}

impl ContentRange {
    /// Range for `returned` rows starting at `start`
    ///
    /// An empty first page reports `0-0`.
    pub fn new(start: u64, returned: usize, total: u64) -> Self {
        let end = start.saturating_add(returned as u64).saturating_sub(1);
        Self { start, end, total }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "items {}-{}/{}", self.start, self.end, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_page() {
        assert_eq!(ContentRange::new(0, 10, 42).to_string(), "items 0-9/42");
    }

    #[test]
    fn test_offset_page() {
        assert_eq!(ContentRange::new(10, 5, 15).to_string(), "items 10-14/15");
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(ContentRange::new(0, 0, 0).to_string(), "items 0-0/0");
    }

    #[test]
    fn test_empty_page_past_the_end() {
        assert_eq!(ContentRange::new(20, 0, 3).to_string(), "items 20-19/3");
    }

    #[test]
    fn test_end_does_not_overflow() {
        let range = ContentRange::new(u64::MAX, 2, 1);
        assert_eq!(range.end, u64::MAX - 1);
    }
}
