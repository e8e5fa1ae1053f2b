use std::time::Duration;

/// Everything a login or token operation can fail with.
///
/// Provider-supplied text is carried verbatim so it can be matched against
/// provider documentation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "missing client ID; pass --client-id or set GCHATCTL_CLIENT_ID (create one in Google Cloud Console: APIs & Services > Credentials)"
    )]
    MissingClientId,

    #[error("invalid mode {0:?}, expected auto|browser|device")]
    InvalidMode(String),

    #[error("timeout must be greater than 0")]
    InvalidTimeout,

    #[error("state mismatch")]
    StateMismatch,

    #[error("missing auth code{}", .provider_error.as_ref().map(|e| format!(" (provider returned: {e})")).unwrap_or_default())]
    MissingCode { provider_error: Option<String> },

    #[error("timed out waiting for browser callback after {}", format_duration(*.0))]
    CallbackTimeout(Duration),

    #[error("callback server stopped before a result was delivered")]
    CallbackAborted,

    #[error("device login timed out")]
    DeviceLoginTimedOut,

    #[error("authorization denied")]
    AuthorizationDenied,

    #[error("device code expired")]
    DeviceCodeExpired,

    #[error("device token error: {0}")]
    DeviceToken(String),

    #[error("device code request failed: {0}")]
    DeviceCodeRequest(String),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("token response missing access_token")]
    MissingAccessToken,

    #[error("profile {profile:?} is not authenticated; run: gchatctl auth login --profile {profile}")]
    NotAuthenticated { profile: String },

    #[error("missing OAuth client ID in config; run `gchatctl auth login` again")]
    ClientIdNotConfigured,

    #[error("access token expired and no refresh token is stored; run: gchatctl auth login")]
    RefreshUnavailable,

    #[error("secure random source failed: {0}")]
    Random(String),

    #[error("could not bind loopback listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True when a profile simply has no stored token yet.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated { .. })
    }
}

/// Render a duration the way users type it on the command line (`3m`, `1m30s`).
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    if total == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}
