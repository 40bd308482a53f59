//! Trait for obtaining the ordered stop list of a line.

use serde::Serialize;

use crate::error::UpstreamError;

/// A stop as listed on a line's route page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedStop {
    pub seq: u32,
    pub code: String,
    pub name: String,
}

/// Supplies the stops of a line in travel order, both directions concatenated.
#[async_trait::async_trait]
pub trait RouteStopSource: Send + Sync {
    async fn fetch_ordered_stops(&self, line: &str) -> Result<Vec<OrderedStop>, UpstreamError>;
}
