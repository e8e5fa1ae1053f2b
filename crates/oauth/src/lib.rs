//! OAuth 2.0 login and token management for gchatctl.
//!
//! Two interactive flows obtain tokens: the authorization-code flow with PKCE
//! over a loopback redirect ([`OAuthFlow`]) and the device authorization grant
//! ([`device_flow`]). Tokens are persisted per profile by a [`TokenStore`] and
//! kept fresh by [`TokenLifecycle`].

pub mod callback_server;
pub mod device_flow;
pub mod error;
pub mod flow;
pub mod lifecycle;
pub mod login;
pub mod mode;
pub mod pkce;
pub mod storage;
pub mod token_exchange;
pub mod token_source;
pub mod types;
pub mod ui;

#[cfg(test)]
mod testing;

pub use {
    callback_server::CallbackServer,
    device_flow::{DeviceCode, PollOutcome, login_device},
    error::{Error, Result},
    flow::{DEFAULT_CALLBACK_TIMEOUT, OAuthFlow, authorization_url},
    lifecycle::{AuthSession, TokenLifecycle},
    login::{BrowserOptions, LoginRequest, login},
    mode::{LoginMode, RequestedMode, resolve_mode},
    storage::{FileTokenStore, TokenStore, safe_name},
    token_source::{RefreshingTokenSource, TokenSource},
    types::{Endpoints, OAuthTokens, PkceChallenge, StoredToken},
    ui::{ConsoleUi, LoginUi, LoginWarning},
};
