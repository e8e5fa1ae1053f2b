//! Keeping a profile's stored token in step with what was actually used.

use std::sync::Arc;

use {chrono::Utc, tracing::info};

use gchatctl_config::AppConfig;

use crate::{
    error::{Error, Result},
    storage::TokenStore,
    token_source::{RefreshingTokenSource, TokenSource},
    types::{Endpoints, OAuthTokens, StoredToken},
};

/// Remembers the record loaded for a profile and writes it back only when the
/// token material changed.
pub struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    profile: String,
    loaded: StoredToken,
}

impl TokenLifecycle {
    pub fn new(
        store: Arc<dyn TokenStore>,
        profile: impl Into<String>,
        loaded: StoredToken,
    ) -> Self {
        Self {
            store,
            profile: profile.into(),
            loaded,
        }
    }

    /// Load the profile's record from `store`.
    pub fn load(store: Arc<dyn TokenStore>, profile: &str) -> Result<Self> {
        let loaded = store.load(profile)?;
        Ok(Self::new(store, profile, loaded))
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn record(&self) -> &StoredToken {
        &self.loaded
    }

    /// Persist `current` when any of access token, refresh token, token type
    /// or expiry differs from the loaded record. Returns whether it wrote.
    ///
    /// Scopes and mode are carried over from the loaded record unchanged.
    pub fn persist_if_changed(&mut self, current: &OAuthTokens) -> Result<bool> {
        if self.loaded.token.same_material(current) {
            return Ok(false);
        }
        let mut updated = self.loaded.clone();
        updated.token = current.clone();
        updated.saved_at = Utc::now();
        self.store.save(&self.profile, &updated)?;
        info!(profile = %self.profile, expiry = ?updated.token.expiry, "persisted refreshed token");
        self.loaded = updated;
        Ok(true)
    }

    /// Ask `source` for a token (refreshing if it must) and persist the result
    /// when it changed.
    pub async fn sync(&mut self, source: &dyn TokenSource) -> Result<bool> {
        let current = source.token().await?;
        self.persist_if_changed(&current)
    }
}

/// An authenticated profile ready to sign requests.
pub struct AuthSession {
    lifecycle: TokenLifecycle,
    source: RefreshingTokenSource,
}

impl AuthSession {
    /// Load `profile` and prepare a refreshing token source for it.
    pub fn open(
        store: Arc<dyn TokenStore>,
        config: &AppConfig,
        profile: &str,
        http: reqwest::Client,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let lifecycle = TokenLifecycle::load(store, profile)?;
        if config.oauth_client.client_id.trim().is_empty() {
            return Err(Error::ClientIdNotConfigured);
        }
        let source = RefreshingTokenSource::new(
            http,
            config.oauth_client.clone(),
            endpoints,
            lifecycle.record().token.clone(),
        );
        Ok(Self { lifecycle, source })
    }

    pub fn profile(&self) -> &str {
        self.lifecycle.profile()
    }

    pub fn record(&self) -> &StoredToken {
        self.lifecycle.record()
    }

    /// A currently valid access token.
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.source.token().await?.access_token().to_string())
    }

    /// Attach `Authorization: Bearer <token>` to `request`.
    pub async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Write back the token if it was refreshed during the session.
    pub async fn finish(mut self) -> Result<bool> {
        self.lifecycle.sync(&self.source).await
    }
}
