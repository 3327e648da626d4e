//! Oracle composition
//!
//! Upcoming premieres often still report a non-final structured status, so
//! a page-level premiere signal overrides whatever the structured query says.

use async_trait::async_trait;
use tracing::debug;

use crate::model::VisibilityStatus;
use crate::traits::StatusOracle;

/// Combines a structured status oracle with a page-scanning one
///
/// Resolution order:
/// 1. Page reports `PremiereUpcoming` → `PremiereUpcoming`
/// 2. Structured status is not `Unknown` → structured status
/// 3. Otherwise → page status
pub struct CombinedOracle {
    structured: Box<dyn StatusOracle>,
    page: Box<dyn StatusOracle>,
}

impl CombinedOracle {
    /// Create a combined oracle
    pub fn new(structured: Box<dyn StatusOracle>, page: Box<dyn StatusOracle>) -> Self {
        Self { structured, page }
    }
}

/// Merge the two signals
pub fn resolve(structured: VisibilityStatus, page: VisibilityStatus) -> VisibilityStatus {
    match (structured, page) {
        (_, VisibilityStatus::PremiereUpcoming) => VisibilityStatus::PremiereUpcoming,
        (VisibilityStatus::Unknown, page) => page,
        (structured, _) => structured,
    }
}

#[async_trait]
impl StatusOracle for CombinedOracle {
    async fn check(&self, item_id: &str) -> VisibilityStatus {
        let (structured, page) = tokio::join!(self.structured.check(item_id), self.page.check(item_id));
        let resolved = resolve(structured, page);

        debug!(
            "Combined status for {}: {} ({}={}, {}={})",
            item_id,
            resolved,
            self.structured.oracle_name(),
            structured,
            self.page.oracle_name(),
            page
        );

        resolved
    }

    fn oracle_name(&self) -> &'static str {
        "combined"
    }
}
