//! Structured selection arguments for aggregation queries: which keywords
//! to look at, how to sort, and how to page. These replace ad-hoc SQL
//! fragment assembly at the store boundary.

/// Keyword universe for an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordScope {
    /// Every active keyword in the registry.
    Tracked,
    /// An explicit keyword set (e.g. the most recent day's queries).
    Keywords(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Position,
    DiffPosition,
    Clicks,
    DiffClicks,
    Impressions,
    DiffImpressions,
    Ctr,
    DiffCtr,
}

/// Strict-sign filter on the rounded position difference. Improved means
/// the rank number went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFilter {
    Improved,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Pagination {
    pub const ALL: Pagination = Pagination {
        offset: 0,
        limit: None,
    };

    pub fn top(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    /// One-based page number to offset/limit.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            offset: page.saturating_sub(1) * per_page,
            limit: Some(per_page),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionArgs {
    pub order_by: SortField,
    pub order: SortOrder,
    pub page: Pagination,
    pub position_filter: Option<PositionFilter>,
    /// Backfill active tracked keywords that have no samples with
    /// all-zero metrics. On for the "all tracked" view, off for top-N
    /// views.
    pub include_zero_keywords: bool,
}

impl Default for SelectionArgs {
    fn default() -> Self {
        Self {
            order_by: SortField::DiffPosition,
            order: SortOrder::Ascending,
            page: Pagination::ALL,
            position_filter: None,
            include_zero_keywords: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(Pagination::page(1, 25), Pagination::top(25));
        let third = Pagination::page(3, 25);
        assert_eq!(third.offset, 50);
        assert_eq!(third.limit, Some(25));
    }

    #[test]
    fn page_zero_clamps_to_first_page() {
        assert_eq!(Pagination::page(0, 25).offset, 0);
    }
}
