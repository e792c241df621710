//! Page size and offset resolution
//!
//! Each value is taken from the first source that holds a usable non-zero
//! number: the context override, then the query string, then the default.
//! Query values are read loosely, so `count=abc` or `count=0` simply fall
//! through to the next source.

/// Largest offset or page size a store is asked for (SQL `BIGINT`)
const MAX_WINDOW: u64 = i64::MAX as u64;

/// Resolved paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Rows to skip
    pub offset: u64,
    /// Page size; `None` when pagination is disabled
    pub limit: Option<u64>,
}

/// Inputs to [`resolve_window`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowInput<'a> {
    /// Context override for the page size
    pub count: Option<i64>,
    /// Context override for the offset
    pub offset: Option<i64>,
    /// Context override for the page number
    pub page: Option<i64>,
    /// `count` query parameter
    pub query_count: Option<&'a str>,
    /// `offset` query parameter
    pub query_offset: Option<&'a str>,
    /// `page` query parameter
    pub query_page: Option<&'a str>,
}

/// Parse a query value as a number, treating zero and garbage as absent
pub(crate) fn loose_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok().map(|v| v as f64),
        None => trimmed.parse::<f64>().ok(),
    };
    parsed.filter(|v| v.is_finite() && *v != 0.0)
}

fn nonzero(value: Option<i64>) -> Option<f64> {
    value.filter(|v| *v != 0).map(|v| v as f64)
}

/// Compute the paging window
///
/// The page advance is computed with the requested count before a negative
/// count is reset to `default_count`.
pub fn resolve_window(input: WindowInput<'_>, default_count: i64, pagination: bool) -> Window {
    let default = default_count as f64;
    let mut count = nonzero(input.count)
        .or_else(|| input.query_count.and_then(loose_number))
        .unwrap_or(default);
    let mut offset = nonzero(input.offset)
        .or_else(|| input.query_offset.and_then(loose_number))
        .unwrap_or(0.0);

    let advance = input
        .page
        .map(|page| page as f64 * count)
        .filter(|v| *v != 0.0)
        .or_else(|| {
            input
                .query_page
                .and_then(loose_number)
                .map(|page| page * count)
                .filter(|v| *v != 0.0)
        })
        .unwrap_or(0.0);
    offset += advance;

    if count < 0.0 {
        count = default;
    }

    Window {
        offset: (offset.max(0.0) as u64).min(MAX_WINDOW),
        limit: pagination.then(|| (count.max(0.0) as u64).min(MAX_WINDOW)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(count: Option<&'static str>, offset: Option<&'static str>, page: Option<&'static str>) -> WindowInput<'static> {
        WindowInput {
            query_count: count,
            query_offset: offset,
            query_page: page,
            ..WindowInput::default()
        }
    }

    #[test]
    fn test_defaults() {
        let window = resolve_window(WindowInput::default(), 100, true);
        assert_eq!(window, Window { offset: 0, limit: Some(100) });
    }

    #[test]
    fn test_query_values() {
        let window = resolve_window(query(Some("10"), Some("5"), None), 100, true);
        assert_eq!(window, Window { offset: 5, limit: Some(10) });
    }

    #[test]
    fn test_page_advances_offset() {
        let window = resolve_window(query(Some("10"), Some("5"), Some("2")), 100, true);
        assert_eq!(window, Window { offset: 25, limit: Some(10) });
    }

    #[test]
    fn test_context_overrides_query() {
        let input = WindowInput {
            count: Some(3),
            offset: Some(1),
            page: Some(1),
            query_count: Some("50"),
            query_offset: Some("40"),
            query_page: Some("9"),
        };
        assert_eq!(resolve_window(input, 100, true), Window { offset: 4, limit: Some(3) });
    }

    #[test]
    fn test_zero_and_garbage_fall_through() {
        let window = resolve_window(query(Some("0"), Some("abc"), Some("")), 100, true);
        assert_eq!(window, Window { offset: 0, limit: Some(100) });
    }

    #[test]
    fn test_negative_count_resets_after_page_advance() {
        let window = resolve_window(query(Some("-5"), Some("20"), Some("2")), 100, true);
        assert_eq!(window, Window { offset: 10, limit: Some(100) });
    }

    #[test]
    fn test_negative_offset_clamps() {
        let window = resolve_window(query(None, Some("-7"), None), 100, true);
        assert_eq!(window.offset, 0);
    }

    #[test]
    fn test_huge_values_clamp() {
        let window = resolve_window(query(Some("1e300"), Some("1e300"), None), 100, true);
        assert_eq!(
            window,
            Window {
                offset: i64::MAX as u64,
                limit: Some(i64::MAX as u64)
            }
        );
    }

    #[test]
    fn test_pagination_disabled_omits_limit() {
        let window = resolve_window(query(Some("10"), None, Some("1")), 100, false);
        assert_eq!(window, Window { offset: 10, limit: None });
    }

    #[test]
    fn test_loose_number() {
        assert_eq!(loose_number(" 12 "), Some(12.0));
        assert_eq!(loose_number("0x10"), Some(16.0));
        assert_eq!(loose_number("0"), None);
        assert_eq!(loose_number("NaN"), None);
        assert_eq!(loose_number("inf"), None);
    }
}
