/// Profile used when neither a flag, the environment nor the config file names one.
pub const DEFAULT_PROFILE: &str = "default";

/// Scopes requested when nothing else is configured.
pub const DEFAULT_CHAT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/chat.messages",
    "https://www.googleapis.com/auth/chat.spaces.readonly",
    "https://www.googleapis.com/auth/chat.memberships.readonly",
    "https://www.googleapis.com/auth/chat.users.readstate.readonly",
];

// Environment variables consulted during input resolution.
pub const ENV_CONFIG_DIR: &str = "GCHATCTL_CONFIG_DIR";
pub const ENV_CLIENT_ID: &str = "GCHATCTL_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "GCHATCTL_CLIENT_SECRET";
pub const ENV_PROFILE: &str = "GCHATCTL_PROFILE";
pub const ENV_SCOPES: &str = "GCHATCTL_SCOPES";

// Cloud console pages referenced by `auth setup`.
pub const CONSOLE_CREDENTIALS_URL: &str = "https://console.cloud.google.com/apis/credentials";
pub const CONSOLE_CONSENT_URL: &str = "https://console.cloud.google.com/apis/credentials/consent";
pub const CONSOLE_CHAT_API_URL: &str =
    "https://console.cloud.google.com/apis/library/chat.googleapis.com";

/// The built-in scope set as owned strings.
pub fn default_scopes() -> Vec<String> {
    DEFAULT_CHAT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}
