//! Paging and sorting for search endpoints.

use serde::{Deserialize, Serialize};

use common::{AppError, AppResult};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Highest page number accepted; keeps the row offset within a signed 64-bit SQL OFFSET
pub const MAX_PAGE_NUMBER: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// One `property,direction` sort term. Properties use the DTO (camelCase) names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `title` or `title,desc`.
    pub fn parse(term: &str) -> AppResult<Self> {
        let mut parts = term.split(',').map(str::trim);
        let property = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::bad_request(format!("Invalid sort '{}'", term)))?;

        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => Ok(Self::asc(property)),
            Some("desc") => Ok(Self::desc(property)),
            Some(other) => Err(AppError::bad_request(format!(
                "Invalid sort direction '{}'",
                other
            ))),
        }
    }
}

/// Query parameters: `?page=1&size=20&sort=title,asc;id,desc`
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    pub sort: Option<String>,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = AppError;

    fn try_from(params: PageParams) -> AppResult<Self> {
        let sort = match params.sort.as_deref() {
            Some(terms) => terms
                .split(';')
                .filter(|t| !t.trim().is_empty())
                .map(SortOrder::parse)
                .collect::<AppResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(PageRequest::new(params.page, params.size).with_sort(sort))
    }
}

/// A validated page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number
    pub page: u64,
    pub size: u64,
    pub sort: Vec<SortOrder>,
}

impl PageRequest {
    /// Page numbers outside 1..=MAX_PAGE_NUMBER and sizes outside
    /// 1..=MAX_PAGE_SIZE are clamped.
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE_NUMBER),
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    /// 0-indexed page for the database layer
    pub fn page_index(&self) -> u64 {
        self.page.saturating_sub(1)
    }

    /// Calculate offset for database query
    pub fn offset(&self) -> u64 {
        self.page_index().saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE)
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub meta: PageMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let total_pages = if request.size > 0 {
            total.div_ceil(request.size)
        } else {
            0
        };

        Self {
            content,
            meta: PageMeta {
                page: request.page,
                size: request.size,
                total,
                total_pages,
            },
        }
    }

    /// Same metadata, new content.
    pub fn with_content<U>(self, content: Vec<U>) -> Page<U> {
        Page {
            content,
            meta: self.meta,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        let meta = self.meta;
        Page {
            content: self.content.into_iter().map(f).collect(),
            meta,
        }
    }
}
