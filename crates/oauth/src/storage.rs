//! Per-profile token persistence.

use std::{io::ErrorKind, path::PathBuf};

use tracing::{debug, info};

use gchatctl_config::{DEFAULT_PROFILE, write_private_file};

use crate::{
    error::{Error, Result},
    types::StoredToken,
};

/// Loads, saves and deletes the token record of a profile.
pub trait TokenStore: Send + Sync {
    /// Fails with [`Error::NotAuthenticated`] when the profile has no record.
    fn load(&self, profile: &str) -> Result<StoredToken>;

    fn save(&self, profile: &str, record: &StoredToken) -> Result<()>;

    /// Removing a record that does not exist is not an error.
    fn delete(&self, profile: &str) -> Result<()>;
}

/// Map a profile name onto something safe to embed in a file name.
pub fn safe_name(profile: &str) -> String {
    let trimmed = profile.trim();
    if trimmed.is_empty() {
        return DEFAULT_PROFILE.to_string();
    }
    trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            c => c,
        })
        .collect()
}

/// Stores each profile as `token_<profile>.json` in one directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn token_path(&self, profile: &str) -> PathBuf {
        self.dir.join(format!("token_{}.json", safe_name(profile)))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<StoredToken> {
        let path = self.token_path(profile);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotAuthenticated {
                    profile: profile.to_string(),
                });
            },
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "loaded token record");
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, profile: &str, record: &StoredToken) -> Result<()> {
        let path = self.token_path(profile);
        let json = serde_json::to_vec_pretty(record)?;
        write_private_file(&path, &json)?;
        info!(profile, path = %path.display(), "saved token record");
        Ok(())
    }

    fn delete(&self, profile: &str) -> Result<()> {
        let path = self.token_path(profile);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(profile, path = %path.display(), "deleted token record");
                Ok(())
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
