use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The flow that produced (or will produce) a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    Browser,
    Device,
}

impl LoginMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedMode {
    Auto,
    Explicit(LoginMode),
}

impl FromStr for RequestedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "browser" => Ok(Self::Explicit(LoginMode::Browser)),
            "device" => Ok(Self::Explicit(LoginMode::Device)),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl RequestedMode {
    /// An explicit choice always wins; `auto` falls back to the device flow when
    /// the browser is suppressed or nobody is at the terminal.
    pub fn resolve(self, suppress_browser: bool, interactive: bool) -> LoginMode {
        match self {
            Self::Explicit(mode) => mode,
            Self::Auto if suppress_browser || !interactive => LoginMode::Device,
            Self::Auto => LoginMode::Browser,
        }
    }
}

/// Parse and resolve a mode string in one step.
pub fn resolve_mode(
    requested: &str,
    suppress_browser: bool,
    interactive: bool,
) -> crate::Result<LoginMode> {
    Ok(requested
        .parse::<RequestedMode>()?
        .resolve(suppress_browser, interactive))
}
