use rocket::form::FromForm;
use serde::{Deserialize, Serialize};

/// Query parameters selecting one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromForm)]
pub struct PaginationRequest {
    #[field(default = 1, validate = range(1..))]
    page_num: u32,
    #[field(default = 50, validate = range(1..=500))]
    page_size: u32,
}

impl PaginationRequest {
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num - 1) * u64::from(self.page_size)
    }

    /// Wrap a page of items with this request's metadata.
    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            pagination: PaginationResult {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
            items,
        }
    }
}

/// Where a page sits in the full listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub pagination: PaginationResult,
    pub items: Vec<T>,
}

#[cfg(test)]
impl PaginationRequest {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num,
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_counts_previous_pages() {
        assert_eq!(PaginationRequest::new(1, 50).skip(), 0);
        assert_eq!(PaginationRequest::new(3, 20).skip(), 40);
    }

    #[test]
    fn paginated_metadata() {
        let page = PaginationRequest::new(2, 2).to_paginated(5, vec!['c', 'd']);
        assert_eq!(
            page.pagination,
            PaginationResult {
                page_num: 2,
                page_size: 2,
                total: 5
            }
        );
        assert_eq!(page.items, vec!['c', 'd']);
    }
}
