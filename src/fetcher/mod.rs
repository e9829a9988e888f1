pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::error::Result;
use crate::auth::Session;
use crate::domain::ShareEvent;

pub use http_fetcher::HttpFeedFetcher;

/// Authoritative pull (and submission) boundary for the share list.
///
/// `fetch_all` is the sole source of feed membership truth: its result
/// order is display order. Implementations classify failures as
/// `AuthFailure` (credential rejected) or `Unavailable` (transient);
/// nothing else crosses this boundary.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the full ordered share list under the session's credential.
    async fn fetch_all(&self, session: &Session) -> Result<Vec<ShareEvent>>;

    /// Submit a new share. Success triggers no local state change; the
    /// caller observes its own write through the resulting push
    /// notification or an explicit refresh.
    async fn submit_share(&self, session: &Session, content_id: &str) -> Result<()>;
}
