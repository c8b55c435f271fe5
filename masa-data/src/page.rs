use serde::{Deserialize, Serialize};

const MAX_PAGE_SIZE: u64 = 100;

/// Pagination parameters, extractable from query params.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Page size clamped to `1..=100`.
    pub fn limit(&self) -> u64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.page * self.limit()
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let size = pageable.limit();
        Self {
            content,
            page: pageable.page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }
}
