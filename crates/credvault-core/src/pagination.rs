//! Fixed-size pages over an in-memory list.

use serde::Serialize;

/// Items per page everywhere in the app.
pub const PAGE_SIZE: usize = 12;

/// One page of `T`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Cut page `requested` out of `items`, `per_page` at a time.
    ///
    /// `requested` is parsed leniently: missing or non-numeric gives page 1,
    /// anything past the end gives the last page. An empty list still has
    /// one (empty) page.
    #[must_use]
    pub fn paginate(items: Vec<T>, requested: Option<&str>, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total = items.len();
        let num_pages = total.div_ceil(per_page).max(1);
        let number = requested
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|&n| n >= 1)
            .map_or(1, |n| n.min(num_pages));

        let start = (number - 1).saturating_mul(per_page);
        let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

        Self {
            items,
            number,
            num_pages,
            total,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }

    /// Transform the items, keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page() {
        let page = Page::paginate((1..=30).collect(), Some("2"), PAGE_SIZE);
        assert_eq!(page.items, (13..=24).collect::<Vec<_>>());
        assert_eq!(page.num_pages, 3);
        assert!(page.has_next && page.has_previous);
    }

    #[test]
    fn garbage_page_is_first() {
        for raw in [None, Some("abc"), Some("0"), Some("-4")] {
            let page = Page::paginate((1..=30).collect::<Vec<i32>>(), raw, PAGE_SIZE);
            assert_eq!(page.number, 1);
            assert!(!page.has_previous);
        }
    }

    #[test]
    fn past_the_end_is_last() {
        let page = Page::paginate((1..=30).collect::<Vec<i32>>(), Some("99"), PAGE_SIZE);
        assert_eq!(page.number, 3);
        assert_eq!(page.items.len(), 6);
        assert!(!page.has_next);
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let page = Page::<i32>::paginate(Vec::new(), Some("5"), PAGE_SIZE);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.map(|n| n * 2).total, 0);
    }
}
