use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;

use crate::app::error::{Result, TributaryError};
use crate::auth::Session;
use crate::domain::ShareEvent;
use crate::fetcher::FeedFetcher;

pub struct HttpFeedFetcher {
    client: Client,
    endpoint: String,
}

impl HttpFeedFetcher {
    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("tributary/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }
}

/// Classify a response status at this boundary: 401/403 end the session,
/// anything else non-success is retryable.
fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TributaryError::AuthFailure(
            "share API rejected the access token".to_string(),
        )),
        status if !status.is_success() => Err(TributaryError::Unavailable(format!(
            "share API returned {}",
            status
        ))),
        _ => Ok(response),
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_all(&self, session: &Session) -> Result<Vec<ShareEvent>> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        let response = check_status(response)?;

        response
            .json::<Vec<ShareEvent>>()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))
    }

    async fn submit_share(&self, session: &Session, content_id: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&session.access_token)
            .json(&json!({ "contentId": content_id }))
            .send()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        check_status(response)?;
        Ok(())
    }
}
