//! Pagination of list results.

use super::WorkflowDomainError;
use serde::{Deserialize, Serialize};

/// A validated page request. Pages start at one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Validates a page request against the largest accepted page size.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidPage`] for page zero and
    /// [`WorkflowDomainError::InvalidLimit`] when `limit` is outside
    /// `1..=max_limit`.
    pub const fn new(page: u32, limit: u32, max_limit: u32) -> Result<Self, WorkflowDomainError> {
        if page == 0 {
            return Err(WorkflowDomainError::InvalidPage(page));
        }
        if limit == 0 || limit > max_limit {
            return Err(WorkflowDomainError::InvalidLimit {
                limit,
                max: max_limit,
            });
        }
        Ok(Self { page, limit })
    }

    /// Returns the first page with the given size, without validation.
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self { page: 1, limit }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items skipped before this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    /// Cuts the requested page out of the full, already ordered result.
    #[must_use]
    pub fn paginate(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.limit() as usize)
            .collect();
        Self {
            items,
            page: request.page(),
            limit: request.limit(),
            total,
        }
    }

    /// Applies `f` to every item.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}
