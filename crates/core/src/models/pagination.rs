//! Pagination envelope used by every list endpoint.

use serde::{Deserialize, Serialize};

/// `{count, next, previous, results}` page returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Total number of records across all pages.
    pub count: u64,
    /// Absolute URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    /// Absolute URL of the previous page, if any.
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T> Paginated<T> {
    /// Wrap a complete, single-page result set.
    #[must_use]
    pub fn single_page(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the page and return its records.
    #[must_use]
    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_envelope() {
        let page: Paginated<u32> = serde_json::from_str(
            r#"{"count": 41, "next": "http://api/logs/?page=3", "previous": null, "results": [1, 2]}"#,
        )
        .unwrap();

        assert_eq!(page.count, 41);
        assert!(page.has_next());
        assert!(!page.has_previous());
        assert_eq!(page.into_results(), vec![1, 2]);
    }

    #[test]
    fn test_single_page() {
        let page = Paginated::single_page(vec!["a", "b", "c"]);
        assert_eq!(page.count, 3);
        assert!(!page.has_next());
        assert!(!page.is_empty());
    }
}
