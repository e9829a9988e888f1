use std::sync::Arc;

use crate::app::error::Result;
use crate::auth::{AuthClient, HttpAuthClient};
use crate::config::Config;
use crate::enricher::{HttpMetadataEnricher, MetadataEnricher};
use crate::fetcher::{FeedFetcher, HttpFeedFetcher};
use crate::listener::{PushTransport, WebSocketTransport};

/// Wires configuration and the client implementations together.
///
/// Everything session-scoped (token, identity) lives in an explicit
/// [`Session`](crate::auth::Session) passed to the components that need
/// it; the context itself holds no mutable state.
pub struct AppContext {
    pub config: Config,
    pub auth: Arc<dyn AuthClient>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub enricher: Arc<dyn MetadataEnricher>,
    pub transport: Arc<dyn PushTransport>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        // Validate endpoints up front.
        url::Url::parse(&config.api_base)?;
        url::Url::parse(&config.ws_endpoint)?;
        url::Url::parse(&config.metadata_endpoint)?;

        let auth: Arc<dyn AuthClient> = Arc::new(HttpAuthClient::new(config.signin_endpoint()));
        let fetcher: Arc<dyn FeedFetcher> =
            Arc::new(HttpFeedFetcher::new(config.sharing_endpoint()));
        let enricher: Arc<dyn MetadataEnricher> = Arc::new(HttpMetadataEnricher::new(
            config.metadata_endpoint.clone(),
            config.metadata_api_key.clone(),
        ));
        let transport: Arc<dyn PushTransport> =
            Arc::new(WebSocketTransport::new(config.ws_endpoint.clone()));

        Ok(Self {
            config,
            auth,
            fetcher,
            enricher,
            transport,
        })
    }
}
