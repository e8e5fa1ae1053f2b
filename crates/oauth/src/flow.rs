//! Authorization-code flow with PKCE over a loopback redirect.

use std::time::Duration;

use {
    tracing::{debug, info},
    url::Url,
};

use crate::{
    callback_server::CallbackServer,
    error::{Error, Result},
    login::LoginRequest,
    pkce,
    token_exchange,
    types::{OAuthTokens, PkceChallenge},
    ui::{LoginUi, LoginWarning},
};

/// Default time to wait for the browser redirect.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(180);

/// Build the provider authorization URL for `redirect_uri`.
pub fn authorization_url(
    request: &LoginRequest,
    redirect_uri: &str,
    state: &str,
    pkce: &PkceChallenge,
) -> Result<Url> {
    let mut url = Url::parse(&request.endpoints.auth_url)?;
    url.query_pairs_mut()
        .append_pair("client_id", request.client.client_id.trim())
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &request.scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", PkceChallenge::METHOD)
        .append_pair("state", state);
    Ok(url)
}

/// Browser login driver.
pub struct OAuthFlow<'a> {
    http: &'a reqwest::Client,
    request: &'a LoginRequest,
    open_browser: bool,
    timeout: Duration,
}

impl<'a> OAuthFlow<'a> {
    pub fn new(http: &'a reqwest::Client, request: &'a LoginRequest) -> Self {
        Self {
            http,
            request,
            open_browser: true,
            timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }

    /// Whether to launch the default browser (the URL is printed either way).
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the whole flow: listen, show the URL, wait for the redirect, exchange.
    pub async fn run(&self, ui: &dyn LoginUi) -> Result<OAuthTokens> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }
        self.request.validate()?;

        let state = pkce::new_state()?;
        let mut server = CallbackServer::bind(&state).await?;
        let redirect_uri = server.redirect_uri();

        let pkce = match pkce::generate() {
            Ok(pkce) => pkce,
            Err(e) => {
                server.shutdown().await;
                return Err(e);
            },
        };
        let url = match authorization_url(self.request, &redirect_uri, &state, &pkce) {
            Ok(url) => url,
            Err(e) => {
                server.shutdown().await;
                return Err(e);
            },
        };

        ui.authorization_url(url.as_str());
        if self.open_browser {
            if let Err(e) = open::that_detached(url.as_str()) {
                ui.warn(&LoginWarning::BrowserLaunchFailed(e.to_string()));
            }
        }

        debug!(timeout = ?self.timeout, %redirect_uri, "waiting for browser callback");
        let code = server.wait(self.timeout).await;
        server.shutdown().await;
        let code = code?;

        let tokens = token_exchange::exchange_code(
            self.http,
            &self.request.client,
            &self.request.endpoints,
            &code,
            &pkce.verifier,
            &redirect_uri,
        )
        .await?;

        if !tokens.has_refresh_token() {
            ui.warn(&LoginWarning::MissingRefreshToken);
        }
        info!(expiry = ?tokens.expiry, "browser login complete");
        Ok(tokens)
    }
}
