use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::{defaults::DEFAULT_PROFILE, secret::serialize_option_secret};

/// OAuth client registered in the provider console.
///
/// An empty or absent secret means a public client that relies on PKCE alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthClient {
    #[serde(default)]
    pub client_id: String,
    #[serde(default, serialize_with = "serialize_option_secret")]
    pub client_secret: Option<Secret<String>>,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(Secret::new),
        }
    }

    /// The client secret, if one is set and non-blank.
    pub fn secret(&self) -> Option<&str> {
        self.client_secret
            .as_ref()
            .map(|s| s.expose_secret().trim())
            .filter(|s| !s.is_empty())
    }

    pub fn is_public(&self) -> bool {
        self.secret().is_none()
    }
}

/// Settings shared by every profile, persisted as `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub default_profile: String,
    #[serde(default)]
    pub oauth_client: OAuthClient,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_profile: default_profile(),
            oauth_client: OAuthClient::default(),
            scopes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_is_public_client() {
        let client = OAuthClient::new("id", Some("   ".into()));
        assert!(client.client_secret.is_none());
        assert!(client.is_public());

        let client = OAuthClient::new("id", Some("shh".into()));
        assert_eq!(client.secret(), Some("shh"));
        assert!(!client.is_public());
    }

    #[test]
    fn empty_default_profile_falls_back() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.default_profile, "default");
        assert!(cfg.scopes.is_empty());
        assert!(cfg.oauth_client.client_id.is_empty());
    }

    #[test]
    fn legacy_empty_secret_string_reads_as_public() {
        let json = r#"{
            "default_profile": "work",
            "oauth_client": {"client_id": "abc.apps.googleusercontent.com", "client_secret": ""},
            "scopes": ["s1"]
        }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_profile, "work");
        assert!(cfg.oauth_client.is_public());
        assert_eq!(cfg.scopes, vec!["s1".to_string()]);
    }

    #[test]
    fn secret_survives_serialization() {
        let cfg = AppConfig {
            oauth_client: OAuthClient::new("id", Some("top".into())),
            ..AppConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.oauth_client.secret(), Some("top"));
    }
}
