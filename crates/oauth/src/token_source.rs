use {async_trait::async_trait, chrono::Utc, tokio::sync::Mutex, tracing::debug};

use gchatctl_config::OAuthClient;

use crate::{
    error::{Error, Result},
    token_exchange,
    types::{Endpoints, OAuthTokens},
};

/// Supplies an access token that is valid right now.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<OAuthTokens>;
}

/// Hands out the held token while it is valid and refreshes it otherwise.
pub struct RefreshingTokenSource {
    http: reqwest::Client,
    client: OAuthClient,
    endpoints: Endpoints,
    current: Mutex<OAuthTokens>,
}

impl RefreshingTokenSource {
    pub fn new(
        http: reqwest::Client,
        client: OAuthClient,
        endpoints: Endpoints,
        seed: OAuthTokens,
    ) -> Self {
        Self {
            http,
            client,
            endpoints,
            current: Mutex::new(seed),
        }
    }

    /// The tokens currently held, without triggering a refresh.
    pub async fn current(&self) -> OAuthTokens {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    async fn token(&self) -> Result<OAuthTokens> {
        let mut current = self.current.lock().await;
        if current.is_valid(Utc::now()) {
            return Ok(current.clone());
        }
        let refresh_token = current
            .refresh_token()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::RefreshUnavailable)?
            .to_string();

        debug!(expiry = ?current.expiry, "access token expired, refreshing");
        let refreshed =
            token_exchange::refresh(&self.http, &self.client, &self.endpoints, &refresh_token)
                .await?;
        *current = refreshed.clone();
        Ok(refreshed)
    }
}
