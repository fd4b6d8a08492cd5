//! Pagination types

use crate::types::LedgerError;

/// Largest page a caller may ask for unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// A zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Reject empty pages and pages above `max_page_size`
    pub fn validate(&self, max_page_size: usize) -> Result<(), LedgerError> {
        if self.page_size == 0 || self.page_size > max_page_size {
            return Err(LedgerError::invalid_request(format!(
                "page size must be between 1 and {}, got {}",
                max_page_size, self.page_size
            )));
        }
        Ok(())
    }

    /// Index of the first element on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }
}

/// One page of results plus the totals needed to walk the rest
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice one page out of an already ordered collection
    pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
        let total_elements = all.len();
        let total_pages = total_elements.div_ceil(request.page_size.max(1));
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();

        Page {
            items,
            page_number: request.page,
            page_size: request.page_size,
            total_elements,
            total_pages,
        }
    }

    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        self.page_number + 1 < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::first_page(0, 3, vec![1, 2, 3], true)]
    #[case::middle_page(1, 3, vec![4, 5, 6], true)]
    #[case::last_partial_page(2, 3, vec![7], false)]
    #[case::past_the_end(5, 3, vec![], false)]
    fn test_from_ordered(
        #[case] page: usize,
        #[case] size: usize,
        #[case] expected: Vec<i32>,
        #[case] has_next: bool,
    ) {
        let all: Vec<i32> = (1..=7).collect();
        let result = Page::from_ordered(all, PageRequest::new(page, size));

        assert_eq!(result.items, expected);
        assert_eq!(result.total_elements, 7);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.has_next(), has_next);
    }

    #[test]
    fn test_empty_collection_has_zero_pages() {
        let result: Page<i32> = Page::from_ordered(Vec::new(), PageRequest::new(0, 10));
        assert!(result.items.is_empty());
        assert_eq!(result.total_pages, 0);
        assert!(!result.has_next());
    }

    #[rstest]
    #[case(0)]
    #[case(101)]
    fn test_validate_rejects_bad_sizes(#[case] size: usize) {
        assert!(PageRequest::new(0, size).validate(DEFAULT_MAX_PAGE_SIZE).is_err());
    }
}
