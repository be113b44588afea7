//! Goods search query and result types.

use serde::{Deserialize, Serialize};

use crate::types::search_document::GoodsSearchDocument;

/// Default page size when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter for goods searches.
///
/// Every field is optional; an all-default filter matches every document.
/// `pages` is 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GoodsFilter {
    /// Free text matched against `name` and `goods_brief`.
    pub keywords: Option<String>,
    pub category_ids: Vec<i32>,
    pub brand_id: Option<i32>,
    pub price_min: Option<f32>,
    pub price_max: Option<f32>,
    pub is_hot: Option<bool>,
    pub is_new: Option<bool>,
    pub on_sale: Option<bool>,
    pub pages: u32,
    pub page_per_nums: u32,
}

impl GoodsFilter {
    /// A filter that matches everything, one page at a time.
    pub fn all(page: u32, page_size: u32) -> Self {
        Self {
            pages: page,
            page_per_nums: page_size,
            ..Default::default()
        }
    }

    /// The 1-based page, treating 0 as the first page.
    pub fn page(&self) -> u32 {
        self.pages.max(1)
    }

    /// The page size, defaulted and clamped to [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        match self.page_per_nums {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    /// Offset of the first hit on the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }
}

/// One page of goods search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GoodsSearchPage {
    /// Total number of matching documents, across all pages.
    pub total: u64,
    pub documents: Vec<GoodsSearchDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let filter = GoodsFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let filter = GoodsFilter::all(3, 500);
        assert_eq!(filter.page_size(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 200);
    }
}
