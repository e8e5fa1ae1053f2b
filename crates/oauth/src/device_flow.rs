//! Device authorization grant (RFC 8628).

use std::time::Duration;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tokio::time::Instant,
    tracing::{debug, info},
};

use gchatctl_config::OAuthClient;

use crate::{
    error::{Error, Result},
    login::LoginRequest,
    token_exchange::{TokenResponse, client_form},
    types::{Endpoints, OAuthTokens},
    ui::LoginUi,
};

pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Poll interval used when the provider does not supply one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Added to the poll interval for every `slow_down` response.
pub const SLOW_DOWN_STEP_SECS: u64 = 5;
/// Lifetime assumed when the provider reports none.
pub const DEFAULT_CODE_LIFETIME_SECS: u64 = 1800;

/// Response from the device code request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    #[serde(default, alias = "verification_uri")]
    pub verification_url: String,
    #[serde(default, alias = "verification_uri_complete")]
    pub verification_url_complete: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub interval: i64,
}

impl DeviceCode {
    /// The URL to show the user; the pre-filled variant when offered.
    pub fn display_url(&self) -> &str {
        if self.verification_url_complete.is_empty() {
            &self.verification_url
        } else {
            &self.verification_url_complete
        }
    }

    pub fn poll_interval(&self) -> Duration {
        match u64::try_from(self.interval) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn lifetime(&self) -> Duration {
        match u64::try_from(self.expires_in) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_CODE_LIFETIME_SECS),
        }
    }
}

/// Result of a single poll of the token endpoint.
#[derive(Debug)]
pub enum PollOutcome {
    Pending,
    SlowDown,
    Approved(OAuthTokens),
}

/// Interpret one token-endpoint answer received at `now`.
pub fn classify(resp: TokenResponse, now: DateTime<Utc>) -> Result<PollOutcome> {
    match resp.error.as_str() {
        "" => {},
        "authorization_pending" => return Ok(PollOutcome::Pending),
        "slow_down" => return Ok(PollOutcome::SlowDown),
        "access_denied" => return Err(Error::AuthorizationDenied),
        "expired_token" => return Err(Error::DeviceCodeExpired),
        other => return Err(Error::DeviceToken(other.to_string())),
    }
    if resp.access_token.is_empty() {
        return Ok(PollOutcome::Pending);
    }
    resp.into_tokens(now).map(PollOutcome::Approved)
}

/// Wait before the next poll. `slow_down` raises it for the rest of the flow.
pub fn next_interval(current: Duration, outcome: &PollOutcome) -> Duration {
    match outcome {
        PollOutcome::SlowDown => current + Duration::from_secs(SLOW_DOWN_STEP_SECS),
        PollOutcome::Pending | PollOutcome::Approved(_) => current,
    }
}

/// Ask the provider for a device code covering `scopes`.
pub async fn request_device_code(
    http: &reqwest::Client,
    client: &OAuthClient,
    endpoints: &Endpoints,
    scopes: &[String],
) -> Result<DeviceCode> {
    let scope = scopes.join(" ");
    let resp = http
        .post(&endpoints.device_url)
        .header("Accept", "application/json")
        .form(&[("client_id", client.client_id.trim()), ("scope", scope.as_str())])
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::DeviceCodeRequest(body.trim().to_string()));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Poll the token endpoint once.
///
/// Pending answers arrive with a 4xx status, so the body is interpreted
/// regardless of status.
pub async fn poll_once(
    http: &reqwest::Client,
    client: &OAuthClient,
    endpoints: &Endpoints,
    device_code: &str,
) -> Result<PollOutcome> {
    let form = client_form(client, vec![
        ("device_code", device_code),
        ("grant_type", DEVICE_GRANT_TYPE),
    ]);
    let resp = http
        .post(&endpoints.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    let parsed: TokenResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => {
            return Err(Error::TokenEndpoint {
                status,
                body: body.trim().to_string(),
            });
        },
        Err(e) => return Err(e.into()),
    };
    classify(parsed, Utc::now())
}

/// Poll until the user approves, the provider refuses, or the code expires.
///
/// The first poll happens immediately; each pending answer waits one interval.
pub async fn poll_for_token(
    http: &reqwest::Client,
    client: &OAuthClient,
    endpoints: &Endpoints,
    code: &DeviceCode,
    issued_at: Instant,
) -> Result<OAuthTokens> {
    let deadline = issued_at + code.lifetime();
    let mut interval = code.poll_interval();

    while Instant::now() < deadline {
        let outcome = poll_once(http, client, endpoints, &code.device_code).await?;
        if let PollOutcome::Approved(tokens) = outcome {
            return Ok(tokens);
        }
        interval = next_interval(interval, &outcome);
        debug!(?outcome, interval = ?interval, "device authorization not yet granted");
        tokio::time::sleep(interval).await;
    }
    Err(Error::DeviceLoginTimedOut)
}

/// Run the device flow end to end.
pub async fn login_device(
    http: &reqwest::Client,
    request: &LoginRequest,
    ui: &dyn LoginUi,
) -> Result<OAuthTokens> {
    request.validate()?;
    let code =
        request_device_code(http, &request.client, &request.endpoints, &request.scopes).await?;
    let issued_at = Instant::now();
    debug!(
        expires_in = code.expires_in,
        interval = code.interval,
        "device code issued"
    );
    ui.device_code(&code);

    let tokens = poll_for_token(http, &request.client, &request.endpoints, &code, issued_at).await?;
    info!(expiry = ?tokens.expiry, "device login complete");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    use {
        axum::{Router, extract::Form, routing::post},
        std::{
            collections::HashMap,
            sync::{
                Arc, Mutex,
                atomic::{AtomicUsize, Ordering},
            },
        },
    };

    use crate::testing::{RecordingUi, start_mock};

    fn response(error: &str, access_token: &str) -> TokenResponse {
        TokenResponse {
            error: error.into(),
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    fn request(base: &str) -> LoginRequest {
        LoginRequest::new(
            OAuthClient::new("cid", None),
            vec!["scope.a".into(), "scope.b".into()],
            Endpoints {
                auth_url: format!("{base}/auth"),
                token_url: format!("{base}/token"),
                device_url: format!("{base}/device"),
            },
        )
    }

    #[test]
    fn classify_maps_provider_errors() {
        let now = Utc::now();
        assert!(matches!(
            classify(response("authorization_pending", ""), now).unwrap(),
            PollOutcome::Pending
        ));
        assert!(matches!(
            classify(response("slow_down", ""), now).unwrap(),
            PollOutcome::SlowDown
        ));
        assert!(matches!(
            classify(response("", ""), now).unwrap(),
            PollOutcome::Pending
        ));

        let err = classify(response("access_denied", ""), now).unwrap_err();
        assert_eq!(err.to_string(), "authorization denied");
        let err = classify(response("expired_token", ""), now).unwrap_err();
        assert_eq!(err.to_string(), "device code expired");
        let err = classify(response("invalid_client", ""), now).unwrap_err();
        assert_eq!(err.to_string(), "device token error: invalid_client");
    }

    #[test]
    fn slow_down_raises_interval_permanently() {
        let mut interval = Duration::from_secs(1);
        let steps = [
            (PollOutcome::Pending, 1),
            (PollOutcome::SlowDown, 6),
            (PollOutcome::Pending, 6),
            (PollOutcome::SlowDown, 11),
            (PollOutcome::Pending, 11),
        ];
        for (outcome, expected) in steps {
            interval = next_interval(interval, &outcome);
            assert_eq!(interval, Duration::from_secs(expected), "{outcome:?}");
        }
    }

    #[test]
    fn classify_error_wins_over_token() {
        let err = classify(response("access_denied", "at"), Utc::now()).unwrap_err();
        assert!(matches!(err, Error::AuthorizationDenied));
    }

    #[test]
    fn classify_approved_computes_expiry() {
        let now = Utc::now();
        let resp = TokenResponse {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_in: 3600,
            token_type: "Bearer".into(),
            ..Default::default()
        };
        let PollOutcome::Approved(tokens) = classify(resp, now).unwrap() else {
            panic!("expected approval");
        };
        assert_eq!(tokens.refresh_token(), Some("rt"));
        assert_eq!(tokens.expiry, Some(now + chrono::Duration::seconds(3600)));
    }

    #[test]
    fn device_code_defaults() {
        let raw = r#"{
            "device_code": "d",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://example.com/device"
        }"#;
        let code: DeviceCode = serde_json::from_str(raw).unwrap();
        assert_eq!(code.verification_url, "https://example.com/device");
        assert_eq!(code.display_url(), "https://example.com/device");
        assert_eq!(code.poll_interval(), Duration::from_secs(5));
        assert_eq!(code.lifetime(), Duration::from_secs(1800));

        let code = DeviceCode {
            verification_url_complete: "https://example.com/device?code=ABCD".into(),
            interval: -3,
            ..code
        };
        assert_eq!(code.display_url(), "https://example.com/device?code=ABCD");
        assert_eq!(code.poll_interval(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn device_code_request_failure_echoes_body() {
        let app = Router::new().route(
            "/device",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, " invalid_client \n") }),
        );
        let base = start_mock(app).await;
        let req = request(&base);
        let http = reqwest::Client::new();
        let err = request_device_code(&http, &req.client, &req.endpoints, &req.scopes)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "device code request failed: invalid_client");
    }

    #[tokio::test]
    async fn approves_after_pending_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let device_form = Arc::new(Mutex::new(HashMap::new()));
        let poll_form = Arc::new(Mutex::new(HashMap::new()));

        let app = Router::new()
            .route(
                "/device",
                post({
                    let device_form = Arc::clone(&device_form);
                    move |Form(form): Form<HashMap<String, String>>| {
                        let device_form = Arc::clone(&device_form);
                        async move {
                            *device_form.lock().unwrap() = form;
                            axum::Json(serde_json::json!({
                                "device_code": "dev-1",
                                "user_code": "ABCD-EFGH",
                                "verification_url": "https://example.com/device",
                                "expires_in": 3,
                                "interval": 1
                            }))
                        }
                    }
                }),
            )
            .route(
                "/token",
                post({
                    let polls = Arc::clone(&polls);
                    let poll_form = Arc::clone(&poll_form);
                    move |Form(form): Form<HashMap<String, String>>| {
                        let polls = Arc::clone(&polls);
                        let poll_form = Arc::clone(&poll_form);
                        async move {
                            *poll_form.lock().unwrap() = form;
                            if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                                (
                                    axum::http::StatusCode::PRECONDITION_REQUIRED,
                                    axum::Json(
                                        serde_json::json!({"error": "authorization_pending"}),
                                    ),
                                )
                            } else {
                                (
                                    axum::http::StatusCode::OK,
                                    axum::Json(serde_json::json!({
                                        "access_token": "tok-123",
                                        "refresh_token": "rt-123",
                                        "expires_in": 3600,
                                        "token_type": "Bearer"
                                    })),
                                )
                            }
                        }
                    }
                }),
            );
        let base = start_mock(app).await;
        let req = request(&base);
        let (ui, _urls) = RecordingUi::new();

        let started = std::time::Instant::now();
        let tokens = login_device(&reqwest::Client::new(), &req, &ui).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(tokens.access_token(), "tok-123");
        assert!(tokens.expiry.is_some());
        assert_eq!(polls.load(Ordering::SeqCst), 3);

        let shown = ui.device_codes.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].user_code, "ABCD-EFGH");

        let device_form = device_form.lock().unwrap().clone();
        assert_eq!(device_form["client_id"], "cid");
        assert_eq!(device_form["scope"], "scope.a scope.b");

        let poll_form = poll_form.lock().unwrap().clone();
        assert_eq!(poll_form["device_code"], "dev-1");
        assert_eq!(poll_form["grant_type"], DEVICE_GRANT_TYPE);
        assert!(!poll_form.contains_key("client_secret"));
    }

    #[tokio::test]
    async fn times_out_when_never_approved() {
        let app = Router::new()
            .route(
                "/device",
                post(|| async {
                    axum::Json(serde_json::json!({
                        "device_code": "dev-1",
                        "user_code": "X",
                        "verification_url": "https://example.com/device",
                        "expires_in": 1,
                        "interval": 1
                    }))
                }),
            )
            .route(
                "/token",
                post(|| async {
                    axum::Json(serde_json::json!({"error": "authorization_pending"}))
                }),
            );
        let base = start_mock(app).await;
        let (ui, _urls) = RecordingUi::new();
        let err = login_device(&reqwest::Client::new(), &request(&base), &ui)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "device login timed out");
    }

    #[tokio::test]
    async fn denial_stops_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/device",
                post(|| async {
                    axum::Json(serde_json::json!({
                        "device_code": "dev-1",
                        "user_code": "X",
                        "verification_url": "https://example.com/device",
                        "expires_in": 30,
                        "interval": 1
                    }))
                }),
            )
            .route(
                "/token",
                post({
                    let polls = Arc::clone(&polls);
                    move || {
                        polls.fetch_add(1, Ordering::SeqCst);
                        async { axum::Json(serde_json::json!({"error": "access_denied"})) }
                    }
                }),
            );
        let base = start_mock(app).await;
        let (ui, _urls) = RecordingUi::new();
        let err = login_device(&reqwest::Client::new(), &request(&base), &ui)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthorizationDenied));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }
}
