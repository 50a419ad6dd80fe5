//! Cursor pagination types for history endpoints.
//!
//! History is served newest-first. A cursor is the opaque secondary id of the
//! last item on the previous page; the first page has no cursor.

use serde::{Deserialize, Serialize};

/// Request parameters for cursor-paginated queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CursorRequest {
    /// Cursor of the last item already seen, if any.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl CursorRequest {
    /// Returns the cursor, treating an empty string as "first page".
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// One page of newest-first results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Cursor for the following page, absent on the last page.
    pub next_cursor: Option<String>,
    /// True when no older items exist.
    pub is_last_page: bool,
}

impl<T> CursorPage<T> {
    /// Builds a page from its items.
    ///
    /// `cursor_of` extracts the cursor of the last item when more items exist.
    #[must_use]
    pub fn new(data: Vec<T>, is_last_page: bool, cursor_of: impl Fn(&T) -> String) -> Self {
        let next_cursor = if is_last_page {
            None
        } else {
            data.last().map(cursor_of)
        };

        Self {
            data,
            next_cursor,
            is_last_page,
        }
    }

    /// An empty, final page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            next_cursor: None,
            is_last_page: true,
        }
    }

    /// Maps each item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            data: self.data.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            is_last_page: self.is_last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_request_ignores_empty_cursor() {
        let request = CursorRequest {
            cursor: Some(String::new()),
        };
        assert_eq!(request.cursor(), None);

        let request = CursorRequest {
            cursor: Some("abc".into()),
        };
        assert_eq!(request.cursor(), Some("abc"));
    }

    #[test]
    fn test_page_with_more_items_has_cursor() {
        let page = CursorPage::new(vec![3, 2, 1], false, ToString::to_string);
        assert_eq!(page.next_cursor.as_deref(), Some("1"));
        assert!(!page.is_last_page);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let page = CursorPage::new(vec![3, 2, 1], true, ToString::to_string);
        assert_eq!(page.next_cursor, None);
        assert!(page.is_last_page);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = CursorPage::new(vec![1, 2], false, ToString::to_string).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.next_cursor.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_page() {
        let page: CursorPage<i32> = CursorPage::empty();
        assert!(page.data.is_empty());
        assert!(page.is_last_page);
    }
}
