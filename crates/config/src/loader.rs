use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    defaults::{DEFAULT_PROFILE, ENV_CONFIG_DIR},
    schema::AppConfig,
};

const CONFIG_FILE: &str = "config.json";

/// Resolve (and create) the gchatctl config directory.
///
/// `GCHATCTL_CONFIG_DIR` overrides the platform config directory.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let dir = match std::env::var_os(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine user config directory"))?
            .config_dir()
            .join("gchatctl"),
    };
    ensure_private_dir(&dir)?;
    Ok(dir)
}

/// Load `config.json` from `dir`. A missing file yields defaults.
pub fn load_config_in(dir: &Path) -> anyhow::Result<AppConfig> {
    let path = dir.join(CONFIG_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let mut cfg: AppConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    if cfg.default_profile.trim().is_empty() {
        cfg.default_profile = DEFAULT_PROFILE.to_string();
    }
    Ok(cfg)
}

pub fn save_config_in(dir: &Path, cfg: &AppConfig) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(cfg)?;
    write_private_file(&dir.join(CONFIG_FILE), &bytes)
}

/// Write `bytes` to `path` with owner-only permissions.
///
/// The data lands in a sibling temp file first and is renamed into place, so a
/// crash mid-write never leaves a truncated record behind.
pub fn write_private_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", path.display()))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))?
        .to_string_lossy();
    let tmp = parent.join(format!(".{file_name}.tmp"));

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts
        .open(&tmp)
        .with_context(|| format!("creating {}", tmp.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote private file");
    Ok(())
}

fn ensure_private_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
