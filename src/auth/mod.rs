use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::app::error::{Result, TributaryError};

/// Login input accepted at the authentication boundary.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// An authenticated session.
///
/// The token is the bearer credential for all REST calls and scopes the
/// push subscription topic. Held explicitly and passed to the components
/// that need it; there is no ambient session state.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub identity: String,
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Exchange credentials for a session, or `AuthFailure` if rejected.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
    username: String,
}

pub struct HttpAuthClient {
    client: Client,
    endpoint: String,
}

impl HttpAuthClient {
    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("tributary/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, endpoint }
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(credentials)
            .send()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TributaryError::AuthFailure(format!(
                    "sign-in rejected for {}",
                    credentials.username
                )));
            }
            status if !status.is_success() => {
                return Err(TributaryError::Unavailable(format!(
                    "sign-in returned {}",
                    status
                )));
            }
            _ => {}
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| TributaryError::Unavailable(e.to_string()))?;

        Ok(Session {
            access_token: body.token,
            identity: body.username,
        })
    }
}
