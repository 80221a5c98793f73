//! Query Builder pagination operations

use serde::Serialize;

use super::builder::QueryBuilder;
use crate::model::Record;

impl<M> QueryBuilder<M> {
    /// Add LIMIT clause
    pub fn limit(mut self, count: u64) -> Self {
        self.limit_count = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: u64) -> Self {
        self.offset_value = Some(count);
        self
    }
}

/// Page arithmetic for one page of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    /// 1-based position of the first row on the page, 0 when there are no rows
    pub from: u64,
    pub to: u64,
    #[serde(skip)]
    pub offset: u64,
}

impl PageWindow {
    /// Compute the window; `page` and `per_page` are clamped to at least 1
    pub fn compute(page: u64, per_page: u64, total: u64) -> Self {
        let current_page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (current_page - 1).saturating_mul(per_page);

        Self {
            current_page,
            per_page,
            total,
            last_page: total.div_ceil(per_page),
            from: if total > 0 { offset.saturating_add(1) } else { 0 },
            to: current_page.saturating_mul(per_page).min(total),
            offset,
        }
    }
}

/// One page of records plus its position in the full result set
#[derive(Debug, Serialize)]
#[serde(bound = "")]
pub struct Paginated<M> {
    pub data: Vec<Record<M>>,
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: u64,
    pub to: u64,
}

impl<M> Paginated<M> {
    pub(crate) fn new(data: Vec<Record<M>>, window: PageWindow) -> Self {
        Self {
            data,
            current_page: window.current_page,
            per_page: window.per_page,
            total: window.total,
            last_page: window.last_page,
            from: window.from,
            to: window.to,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}
