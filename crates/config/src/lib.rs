//! Configuration for gchatctl: where files live, the record shared across
//! profiles, and how flag/env/file inputs are merged.

pub mod defaults;
pub mod loader;
pub mod resolve;
pub mod schema;
pub mod secret;

pub use {
    defaults::{DEFAULT_CHAT_SCOPES, DEFAULT_PROFILE, default_scopes},
    loader::{config_dir, load_config_in, save_config_in, write_private_file},
    resolve::{choose_profile, choose_scopes, first_non_empty, parse_scope_list, unique_scopes},
    schema::{AppConfig, OAuthClient},
    secret::{serialize_option_secret, serialize_secret},
};
