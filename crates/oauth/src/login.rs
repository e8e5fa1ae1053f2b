use std::time::Duration;

use gchatctl_config::{OAuthClient, default_scopes, unique_scopes};

use crate::{
    device_flow,
    error::{Error, Result},
    flow::{DEFAULT_CALLBACK_TIMEOUT, OAuthFlow},
    mode::LoginMode,
    types::{Endpoints, OAuthTokens},
    ui::LoginUi,
};

/// The inputs shared by both login flows.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub client: OAuthClient,
    pub scopes: Vec<String>,
    pub endpoints: Endpoints,
}

impl LoginRequest {
    /// Scopes are deduplicated; an empty list falls back to the default Chat scopes.
    pub fn new(client: OAuthClient, scopes: Vec<String>, endpoints: Endpoints) -> Self {
        let mut scopes = unique_scopes(scopes.iter().map(String::as_str));
        if scopes.is_empty() {
            scopes = default_scopes();
        }
        Self {
            client,
            scopes,
            endpoints,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.client.client_id.trim().is_empty() {
            return Err(Error::MissingClientId);
        }
        Ok(())
    }
}

/// Options that only the browser flow looks at.
#[derive(Debug, Clone, Copy)]
pub struct BrowserOptions {
    pub open_browser: bool,
    pub timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            open_browser: true,
            timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }
}

/// Run the flow selected by `mode`.
pub async fn login(
    http: &reqwest::Client,
    request: &LoginRequest,
    mode: LoginMode,
    browser: BrowserOptions,
    ui: &dyn LoginUi,
) -> Result<OAuthTokens> {
    tracing::debug!(%mode, scopes = request.scopes.len(), "starting login");
    match mode {
        LoginMode::Browser => {
            OAuthFlow::new(http, request)
                .open_browser(browser.open_browser)
                .timeout(browser.timeout)
                .run(ui)
                .await
        },
        LoginMode::Device => device_flow::login_device(http, request, ui).await,
    }
}
