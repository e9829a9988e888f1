pub mod http_enricher;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::app::error::Result;

pub use http_enricher::HttpMetadataEnricher;

/// Display metadata for one content id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

/// External metadata provider boundary.
///
/// One call covers a whole batch of content ids. The provider may return
/// results unordered or omit ids entirely; omissions are valid and must
/// not fail the batch. Any failure means "all requested ids unresolved
/// this cycle" and never touches already-resolved entries.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    async fn lookup(&self, content_ids: &[String]) -> Result<HashMap<String, VideoMetadata>>;
}
