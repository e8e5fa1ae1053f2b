use std::fmt;

use crate::device_flow::DeviceCode;

/// Non-fatal problems reported during a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginWarning {
    /// The browser could not be launched; the URL was printed instead.
    BrowserLaunchFailed(String),
    /// The provider issued no refresh token, so the login cannot renew itself.
    MissingRefreshToken,
}

impl fmt::Display for LoginWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrowserLaunchFailed(err) => {
                write!(f, "could not open browser automatically: {err}")
            },
            Self::MissingRefreshToken => f.write_str(
                "no refresh token returned; try revoking prior consent and log in again",
            ),
        }
    }
}

/// Where the login flows send user-facing output.
pub trait LoginUi: Send + Sync {
    /// Called once with the authorization URL before waiting for the callback.
    fn authorization_url(&self, url: &str);

    /// Called once with the device code before polling starts.
    fn device_code(&self, code: &DeviceCode);

    fn warn(&self, warning: &LoginWarning);
}

/// Prints to stdout, mirroring warnings into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

impl LoginUi for ConsoleUi {
    fn authorization_url(&self, url: &str) {
        println!("Open this URL to authorize:");
        println!("{url}");
    }

    fn device_code(&self, code: &DeviceCode) {
        println!("Use this device code to authorize:");
        println!("  Code: {}", code.user_code);
        println!("  URL:  {}", code.display_url());
        println!("Waiting for approval...");
    }

    fn warn(&self, warning: &LoginWarning) {
        tracing::warn!(%warning, "login warning");
        println!("warning: {warning}");
    }
}
