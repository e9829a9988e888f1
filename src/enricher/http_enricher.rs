use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::app::error::{Result, TributaryError};
use crate::enricher::{MetadataEnricher, VideoMetadata};

/// Batched metadata lookup against a YouTube-style `videos` endpoint:
/// `GET <endpoint>?id=<csv>&key=<key>&part=snippet`.
pub struct HttpMetadataEnricher {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpMetadataEnricher {
    pub fn new(endpoint: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .user_agent(concat!("tributary/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    items: Vec<LookupItem>,
}

#[derive(Debug, Deserialize)]
struct LookupItem {
    id: String,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

fn into_map(response: LookupResponse) -> HashMap<String, VideoMetadata> {
    response
        .items
        .into_iter()
        .map(|item| {
            (
                item.id,
                VideoMetadata {
                    title: item.snippet.title,
                    description: item.snippet.description,
                },
            )
        })
        .collect()
}

#[async_trait]
impl MetadataEnricher for HttpMetadataEnricher {
    async fn lookup(&self, content_ids: &[String]) -> Result<HashMap<String, VideoMetadata>> {
        if content_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("id", content_ids.join(",")),
                ("key", self.api_key.clone()),
                ("part", "snippet".to_string()),
            ])
            .send()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TributaryError::Unavailable(format!(
                "metadata provider returned {}",
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        Ok(into_map(body))
    }
}
