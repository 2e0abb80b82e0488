//! Paginated search input and output.

use serde::Serialize;

use super::{Patient, ValidationError};

/// A filtered, paginated patient search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text filter on name or uhid; blank means "all patients"
    pub text: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn new(text: Option<String>, page: u32, page_size: u32) -> Self {
        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            text,
            page,
            page_size,
        }
    }

    /// Unfiltered query for the given page.
    pub fn all(page: u32, page_size: u32) -> Self {
        Self::new(None, page, page_size)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::InvalidPaging("page must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(ValidationError::InvalidPaging("page size must be at least 1"));
        }
        Ok(())
    }

    /// Row offset of the first result on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of search results plus the size of the full filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub page: u32,
    pub page_size: u32,
    /// Rows matching the filter across all pages
    pub total_count: u64,
    /// The active filter, echoed back for pager links
    pub text: Option<String>,
}

impl PatientPage {
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }

    /// Last valid page when the requested one is past the end.
    ///
    /// `None` when the page is in range or nothing matched at all.
    pub fn clamp_target(&self) -> Option<u32> {
        clamp_target(self.page, self.total_count, self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

pub(crate) fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub(crate) fn clamp_target(page: u32, total_count: u64, page_size: u32) -> Option<u32> {
    let last = total_pages(total_count, page_size);
    (total_count > 0 && page > last).then_some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blank_text_is_unfiltered() {
        let query = SearchQuery::new(Some("   ".into()), 1, 50);
        assert_eq!(query.text, None);

        let query = SearchQuery::new(Some(" Raj ".into()), 1, 50);
        assert_eq!(query.text, Some("Raj".into()));
    }

    #[test]
    fn test_validate_paging() {
        assert!(SearchQuery::all(1, 50).validate().is_ok());
        assert!(SearchQuery::all(0, 50).validate().is_err());
        assert!(SearchQuery::all(1, 0).validate().is_err());
    }

    #[test]
    fn test_offset() {
        assert_eq!(SearchQuery::all(1, 50).offset(), 0);
        assert_eq!(SearchQuery::all(3, 50).offset(), 100);
    }

    #[test]
    fn test_total_pages_and_clamp() {
        assert_eq!(total_pages(120, 50), 3);
        assert_eq!(total_pages(100, 50), 2);
        assert_eq!(total_pages(0, 50), 0);

        assert_eq!(clamp_target(5, 120, 50), Some(3));
        assert_eq!(clamp_target(3, 120, 50), None);
        // Nothing matched: no redirect, the empty page is rendered as is
        assert_eq!(clamp_target(7, 0, 50), None);
    }

    proptest! {
        #[test]
        fn prop_clamp_lands_on_last_non_empty_page(
            total in 1u64..10_000,
            page_size in 1u32..500,
            page in 1u32..1_000,
        ) {
            let last = total_pages(total, page_size);
            match clamp_target(page, total, page_size) {
                Some(target) => {
                    prop_assert!(page > last);
                    prop_assert_eq!(target, last);
                    let first_row = SearchQuery::all(target, page_size).offset();
                    prop_assert!(first_row < total);
                }
                None => prop_assert!(page <= last),
            }
        }

        #[test]
        fn prop_pages_cover_all_rows(total in 0u64..10_000, page_size in 1u32..500) {
            let pages = u64::from(total_pages(total, page_size));
            prop_assert!(pages * u64::from(page_size) >= total);
            if pages > 0 {
                prop_assert!((pages - 1) * u64::from(page_size) < total);
            }
        }
    }
}
