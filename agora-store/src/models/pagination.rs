//! Pagination and ordering for list queries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Maximum items per page
const MAX_PER_PAGE: u32 = 100;

/// Default items per page for user and community listings
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Default items per page for the thread feed
pub const DEFAULT_THREADS_PER_PAGE: u32 = 10;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub per_page: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Per page is clamped to 1..=100
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.per_page
    }

    /// Wrap a fetched page together with the total match count.
    pub fn wrap<T>(self, items: Vec<T>, total: i64) -> Paginated<T> {
        let is_next = total > (self.offset() + items.len() as u64) as i64;
        Paginated {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
            is_next,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    /// Total count of matches across all pages
    pub total: i64,
    /// Current page number
    pub page: u32,
    /// Items per page
    pub per_page: u32,
    /// More matches exist beyond this page
    pub is_next: bool,
}

impl<T> Paginated<T> {
    /// Calculate total number of pages.
    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 {
            1
        } else {
            let per_page = self.per_page.max(1) as i64;
            ((self.total + per_page - 1) / per_page).max(1) as u32
        }
    }

    /// Check if there's a next page.
    pub fn has_next(&self) -> bool {
        self.is_next
    }

    /// Check if there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Map items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            is_next: self.is_next,
        }
    }
}

/// Sort direction on creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for ORDER BY.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    /// Accepts `asc`/`ascending`/`1` and `desc`/`descending`/`-1`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(Self::Asc),
            "desc" | "descending" | "-1" => Ok(Self::Desc),
            other => Err(ValidationError::InvalidVariant {
                field: "sort order",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_calculation() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(2, 10);
        assert_eq!(p.offset(), 10);

        let p = Pagination::new(3, 25);
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn clamps_page() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn clamps_per_page() {
        let p = Pagination::new(1, 0);
        assert_eq!(p.per_page, 1);

        let p = Pagination::new(1, 999);
        assert_eq!(p.per_page, 100);
    }

    #[test]
    fn total_pages() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.wrap(Vec::<()>::new(), 0).total_pages(), 1);
        assert_eq!(p.wrap(vec![(); 10], 25).total_pages(), 3);
        assert_eq!(p.wrap(vec![(); 10], 100).total_pages(), 10);
    }

    #[test]
    fn is_next_counts_beyond_page() {
        // 30 matches, 10 per page
        let first = Pagination::new(1, 10).wrap(vec![(); 10], 30);
        assert!(first.has_next());
        assert!(!first.has_prev());

        let second = Pagination::new(2, 10).wrap(vec![(); 10], 30);
        assert!(second.has_next());
        assert!(second.has_prev());

        let last = Pagination::new(3, 10).wrap(vec![(); 10], 30);
        assert!(!last.has_next());
        assert!(last.has_prev());
    }

    #[test]
    fn is_next_uses_returned_length() {
        // Short page: 23 matches, page 3 of size 10 returns 3 items
        let short = Pagination::new(3, 10).wrap(vec![(); 3], 23);
        assert!(!short.is_next);

        // Past the end: nothing returned, nothing more
        let past = Pagination::new(9, 10).wrap(Vec::<()>::new(), 23);
        assert!(!past.is_next);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Pagination::new(2, 2).wrap(vec![1, 2], 5).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.page, 2);
        assert!(page.is_next);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!("-1".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!(" ascending ".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!(matches!(
            "sideways".parse::<SortOrder>().unwrap_err(),
            ValidationError::InvalidVariant { .. }
        ));
        assert_eq!(SortOrder::default(), SortOrder::Desc);
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
    }
}
