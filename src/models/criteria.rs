use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

static EMPTY: PagingSearchCriteria = PagingSearchCriteria {
    page_index: 0,
    page_size: DEFAULT_PAGE_SIZE,
    search_terms: Vec::new(),
};

/// Paging and free-text filter parameters shared by query requests.
///
/// An empty `search_terms` list means "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingSearchCriteria {
    #[serde(default)]
    pub page_index: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub search_terms: Vec<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PagingSearchCriteria {
    fn default() -> Self {
        EMPTY.clone()
    }
}

impl PagingSearchCriteria {
    pub fn new(page_index: u32, page_size: u32, search_terms: Vec<String>) -> Self {
        Self {
            page_index,
            page_size,
            search_terms,
        }
    }

    /// Shared "first page, no filter" instance.
    pub fn empty() -> &'static Self {
        &EMPTY
    }

    /// Forces the page size into `1..=max_page_size`.
    pub fn clamped(mut self, max_page_size: u32) -> Self {
        self.page_size = self.page_size.clamp(1, max_page_size.max(1));
        self
    }
}
