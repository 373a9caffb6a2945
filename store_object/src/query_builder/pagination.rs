//! LIMIT / OFFSET handling

/// Pagination configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn new() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// One-based page of `per_page` rows
    pub fn page(page: i64, per_page: i64) -> Self {
        let page = page.max(1);
        Self {
            limit: Some(per_page),
            offset: Some((page - 1).saturating_mul(per_page)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.limit.map_or(true, |l| l >= 0) && self.offset.map_or(true, |o| o >= 0)
    }

    pub fn to_sql(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }
}
