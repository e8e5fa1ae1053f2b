//! Token endpoint helpers (authorization_code + refresh_token grants).

use {
    chrono::{DateTime, Utc},
    serde::Deserialize,
    tracing::debug,
};

use gchatctl_config::OAuthClient;

use crate::{
    error::{Error, Result},
    types::{Endpoints, OAuthTokens},
};

/// Raw token endpoint response. Device polling shares this shape and adds `error`.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub error: String,
}

impl TokenResponse {
    /// Convert a successful response into tokens, measuring expiry from `now`.
    pub fn into_tokens(self, now: DateTime<Utc>) -> Result<OAuthTokens> {
        if self.access_token.trim().is_empty() {
            return Err(Error::MissingAccessToken);
        }
        let expiry =
            (self.expires_in > 0).then(|| now + chrono::Duration::seconds(self.expires_in));
        Ok(OAuthTokens::new(
            self.access_token,
            self.token_type,
            Some(self.refresh_token),
            expiry,
        ))
    }
}

pub(crate) fn client_form<'a>(
    client: &'a OAuthClient,
    mut form: Vec<(&'a str, &'a str)>,
) -> Vec<(&'a str, &'a str)> {
    form.push(("client_id", client.client_id.trim()));
    if let Some(secret) = client.secret() {
        form.push(("client_secret", secret));
    }
    form
}

/// Exchange an authorization code, proving possession with the PKCE verifier.
pub async fn exchange_code(
    http: &reqwest::Client,
    client: &OAuthClient,
    endpoints: &Endpoints,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<OAuthTokens> {
    let form = client_form(client, vec![
        ("grant_type", "authorization_code"),
        ("code", code.trim()),
        ("redirect_uri", redirect_uri),
        ("code_verifier", verifier),
    ]);
    debug!(token_url = %endpoints.token_url, "exchanging authorization code");
    let resp = http
        .post(&endpoints.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await?;
    parse_token_response(resp).await?.into_tokens(Utc::now())
}

/// Trade a refresh token for a new access token.
///
/// Providers usually omit `refresh_token` on refresh; the old one is kept then.
pub async fn refresh(
    http: &reqwest::Client,
    client: &OAuthClient,
    endpoints: &Endpoints,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let form = client_form(client, vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ]);
    debug!(token_url = %endpoints.token_url, "refreshing access token");
    let resp = http
        .post(&endpoints.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await?;
    let mut tokens = parse_token_response(resp).await?.into_tokens(Utc::now())?;
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(secrecy::Secret::new(refresh_token.to_string()));
    }
    Ok(tokens)
}

pub(crate) async fn parse_token_response(resp: reqwest::Response) -> Result<TokenResponse> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::TokenEndpoint {
            status,
            body: body.trim().to_string(),
        });
    }
    Ok(serde_json::from_str(&body)?)
}
