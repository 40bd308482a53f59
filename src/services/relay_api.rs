//! Trait for the JSON endpoints of the relay service.

use serde_json::Value;

use crate::error::UpstreamError;

/// JSON endpoints of the relay service. Bodies are returned undecoded into
/// domain types; the normalizers deal with their varying shapes.
#[async_trait::async_trait]
pub trait RelayApi: Send + Sync {
    /// Live positions of every vehicle currently serving `line`.
    async fn line_vehicles(&self, line: &str) -> Result<Value, UpstreamError>;

    /// Free-text line suggestions.
    async fn line_suggestions(&self, query: &str) -> Result<Value, UpstreamError>;

    /// Descriptive information about `line`.
    async fn line_information(&self, line: &str) -> Result<Value, UpstreamError>;
}
