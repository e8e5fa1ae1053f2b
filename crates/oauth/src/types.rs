use {
    chrono::{DateTime, Datelike, Utc},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Deserializer, Serialize},
};

use gchatctl_config::{serialize_option_secret, serialize_secret};

use crate::mode::LoginMode;

/// Provider endpoints used by the login flows and token refresh.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub device_url: String,
}

impl Endpoints {
    pub const GOOGLE_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const GOOGLE_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const GOOGLE_DEVICE_URL: &'static str = "https://oauth2.googleapis.com/device/code";

    pub fn google() -> Self {
        Self {
            auth_url: Self::GOOGLE_AUTH_URL.into(),
            token_url: Self::GOOGLE_TOKEN_URL.into(),
            device_url: Self::GOOGLE_DEVICE_URL.into(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::google()
    }
}

/// Bearer token material as issued by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_refresh_token",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<Secret<String>>,
    /// `None` when the provider did not report a lifetime.
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Tokens are treated as expired slightly early so a request never races the deadline.
pub const EXPIRY_DELTA_SECS: i64 = 10;

fn default_token_type() -> String {
    "Bearer".into()
}

impl OAuthTokens {
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        let token_type = token_type.into();
        Self {
            access_token: Secret::new(access_token.into()),
            token_type: if token_type.trim().is_empty() {
                default_token_type()
            } else {
                token_type
            },
            refresh_token: refresh_token
                .filter(|t| !t.trim().is_empty())
                .map(Secret::new),
            expiry,
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some_and(|t| !t.trim().is_empty())
    }

    /// Usable for a request made at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.access_token().is_empty() {
            return false;
        }
        match self.expiry {
            None => true,
            Some(expiry) => expiry - chrono::Duration::seconds(EXPIRY_DELTA_SECS) > now,
        }
    }

    /// Compare the fields a refresh can change: access token, refresh token,
    /// token type and expiry.
    pub fn same_material(&self, other: &Self) -> bool {
        self.access_token() == other.access_token()
            && self.refresh_token().unwrap_or_default() == other.refresh_token().unwrap_or_default()
            && self.token_type == other.token_type
            && self.expiry == other.expiry
    }
}

/// The per-profile record persisted by the token store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: OAuthTokens,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub mode: LoginMode,
    pub saved_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(token: OAuthTokens, scopes: Vec<String>, mode: LoginMode) -> Self {
        Self {
            token,
            scopes,
            mode,
            saved_at: Utc::now(),
        }
    }
}

/// PKCE verifier and its S256 challenge. Never persisted.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub const METHOD: &'static str = "S256";
}

fn deserialize_refresh_token<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|t| !t.trim().is_empty()).map(Secret::new))
}

// Records written by older builds use the zero time `0001-01-01T00:00:00Z` for
// "no expiry".
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|t| t.year() > 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(expiry: Option<DateTime<Utc>>) -> OAuthTokens {
        OAuthTokens::new("at", "Bearer", Some("rt".into()), expiry)
    }

    #[test]
    fn validity_respects_expiry_delta() {
        let now = Utc::now();
        assert!(tokens(None).is_valid(now));
        assert!(tokens(Some(now + chrono::Duration::seconds(60))).is_valid(now));
        assert!(!tokens(Some(now + chrono::Duration::seconds(5))).is_valid(now));
        assert!(!tokens(Some(now - chrono::Duration::seconds(1))).is_valid(now));
        assert!(!OAuthTokens::new("", "Bearer", None, None).is_valid(now));
    }

    #[test]
    fn blank_refresh_token_and_type_are_normalized() {
        let t = OAuthTokens::new("at", "", Some("".into()), None);
        assert_eq!(t.token_type, "Bearer");
        assert!(t.refresh_token.is_none());
        assert!(!t.has_refresh_token());
    }

    #[test]
    fn same_material_checks_each_field() {
        let expiry = Some(Utc::now());
        let base = tokens(expiry);
        assert!(base.same_material(&tokens(expiry)));

        let mut other = tokens(expiry);
        other.access_token = Secret::new("at2".into());
        assert!(!base.same_material(&other));

        let other = OAuthTokens::new("at", "Bearer", None, expiry);
        assert!(!base.same_material(&other));

        let other = OAuthTokens::new("at", "MAC", Some("rt".into()), expiry);
        assert!(!base.same_material(&other));

        assert!(!base.same_material(&tokens(None)));
    }

    #[test]
    fn zero_time_expiry_reads_as_none() {
        let json = r#"{
            "token": {
                "access_token": "ya29.x",
                "token_type": "Bearer",
                "refresh_token": "",
                "expiry": "0001-01-01T00:00:00Z"
            },
            "scopes": ["s"],
            "mode": "device",
            "saved_at": "2026-02-17T12:34:56Z"
        }"#;
        let st: StoredToken = serde_json::from_str(json).unwrap();
        assert!(st.token.expiry.is_none());
        assert!(st.token.refresh_token.is_none());
        assert_eq!(st.mode, LoginMode::Device);
        assert_eq!(st.token.access_token(), "ya29.x");
    }

    #[test]
    fn stored_token_layout_is_nested() {
        let st = StoredToken::new(tokens(None), vec!["s".into()], LoginMode::Browser);
        let value = serde_json::to_value(&st).unwrap();
        assert_eq!(value["token"]["access_token"], "at");
        assert_eq!(value["token"]["refresh_token"], "rt");
        assert_eq!(value["mode"], "browser");
        assert!(value["token"].get("expiry").is_none());
    }
}
