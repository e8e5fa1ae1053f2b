use std::{
    io::{BufRead, IsTerminal, Write},
    path::Path,
    sync::Arc,
    time::Duration,
};

use {
    anyhow::{Result, bail},
    chrono::{DateTime, SecondsFormat, Utc},
    clap::Subcommand,
    tracing::warn,
};

use {
    gchatctl_config::{
        AppConfig, OAuthClient, choose_profile, choose_scopes, config_dir, default_scopes,
        defaults::{
            CONSOLE_CHAT_API_URL, CONSOLE_CONSENT_URL, CONSOLE_CREDENTIALS_URL, ENV_CLIENT_ID,
            ENV_CLIENT_SECRET, ENV_PROFILE, ENV_SCOPES,
        },
        first_non_empty, load_config_in, save_config_in,
    },
    gchatctl_oauth::{
        AuthSession, BrowserOptions, ConsoleUi, Endpoints, Error, FileTokenStore, LoginRequest,
        StoredToken, TokenStore, login as run_login, resolve_mode,
    },
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Print the one-time Google Cloud setup checklist.
    Setup {
        /// Open the console pages in the browser.
        #[arg(long)]
        open: bool,
    },
    /// Log in and store a token for a profile.
    Login {
        #[arg(long, env = ENV_PROFILE)]
        profile: Option<String>,
        #[arg(long, env = ENV_CLIENT_ID)]
        client_id: Option<String>,
        #[arg(long, env = ENV_CLIENT_SECRET, hide_env_values = true)]
        client_secret: Option<String>,
        /// Comma-separated OAuth scopes.
        #[arg(long, env = ENV_SCOPES)]
        scopes: Option<String>,
        /// Request the full recommended Chat scope set.
        #[arg(long)]
        all_scopes: bool,
        /// auto, browser or device.
        #[arg(long, default_value = "auto")]
        mode: String,
        /// Do not open a browser automatically.
        #[arg(long)]
        no_open: bool,
        /// How long to wait for the browser callback (e.g. 90s, 3m, 1m30s).
        #[arg(long, default_value = "3m", value_parser = parse_duration)]
        timeout: Duration,
    },
    /// Show the stored token for a profile.
    Status {
        #[arg(long, env = ENV_PROFILE)]
        profile: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Remove the stored token for a profile.
    Logout {
        #[arg(long, env = ENV_PROFILE)]
        profile: Option<String>,
    },
    /// Print a valid access token, refreshing it if needed.
    Token {
        #[arg(long, env = ENV_PROFILE)]
        profile: Option<String>,
    },
}

pub async fn handle_auth(action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Setup { open } => {
            setup(open);
            Ok(())
        },
        AuthAction::Login {
            profile,
            client_id,
            client_secret,
            scopes,
            all_scopes,
            mode,
            no_open,
            timeout,
        } => {
            let args = LoginArgs {
                profile,
                client_id,
                client_secret,
                scopes,
                all_scopes,
                mode,
                no_open,
                timeout,
            };
            login(&config_dir()?, args).await
        },
        AuthAction::Status { profile, json } => status(&config_dir()?, profile.as_deref(), json),
        AuthAction::Logout { profile } => logout(&config_dir()?, profile.as_deref()),
        AuthAction::Token { profile } => token(&config_dir()?, profile.as_deref()).await,
    }
}

fn setup(open_links: bool) {
    println!("Google OAuth setup for gchatctl:");
    println!("1) Enable Google Chat API:");
    println!("   {CONSOLE_CHAT_API_URL}");
    println!("2) Configure OAuth consent screen (External or Internal):");
    println!("   {CONSOLE_CONSENT_URL}");
    println!("3) Create OAuth Client ID:");
    println!("   - Application type: Desktop app (recommended for CLI)");
    println!("   - Page: {CONSOLE_CREDENTIALS_URL}");
    println!("4) Copy the Client ID and run:");
    println!("   gchatctl auth login --client-id <YOUR_CLIENT_ID>");
    println!();
    println!("Optional scopes override:");
    println!(
        "   gchatctl auth login --client-id <YOUR_CLIENT_ID> --scopes https://www.googleapis.com/auth/chat.messages,https://www.googleapis.com/auth/chat.spaces.readonly"
    );

    if !open_links {
        return;
    }
    for link in [CONSOLE_CHAT_API_URL, CONSOLE_CONSENT_URL, CONSOLE_CREDENTIALS_URL] {
        if let Err(e) = open::that_detached(link) {
            warn!(link, error = %e, "could not open link");
            println!("warning: could not open {link}: {e}");
        }
    }
}

struct LoginArgs {
    profile: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<String>,
    all_scopes: bool,
    mode: String,
    no_open: bool,
    timeout: Duration,
}

fn print_client_id_help() {
    println!("OAuth setup needed once:");
    println!("  1) Open Google Cloud Console > APIs & Services > Credentials");
    println!("  2) Create OAuth Client ID (Desktop app)");
    println!("  3) Paste the Client ID below");
    println!("Tip: run `gchatctl auth setup` for direct links.");
    println!("Client secret is optional for browser login.");
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input aborted");
    }
    Ok(line.trim().to_string())
}

/// Scopes in priority order: `--all-scopes`, `--scopes`/env, config, built-in.
fn requested_scopes(all_scopes: bool, raw: Option<&str>, configured: &[String]) -> Vec<String> {
    if all_scopes {
        return default_scopes();
    }
    let scopes = choose_scopes(raw, configured);
    if scopes.is_empty() {
        default_scopes()
    } else {
        scopes
    }
}

async fn login(dir: &Path, args: LoginArgs) -> Result<()> {
    let mut cfg = load_config_in(dir)?;
    let profile = choose_profile(args.profile.as_deref(), &cfg.default_profile);
    let scopes = requested_scopes(args.all_scopes, args.scopes.as_deref(), &cfg.scopes);

    let interactive = std::io::stdin().is_terminal();
    let configured_secret = cfg.oauth_client.secret().map(str::to_string);
    let mut client_id = first_non_empty([
        args.client_id.as_deref(),
        Some(cfg.oauth_client.client_id.as_str()),
    ]);
    let client_secret = first_non_empty([
        args.client_secret.as_deref(),
        configured_secret.as_deref(),
    ]);
    if client_id.is_none() {
        if !interactive {
            return Err(Error::MissingClientId.into());
        }
        print_client_id_help();
        client_id = Some(prompt("Google OAuth client ID: ")?).filter(|id| !id.is_empty());
    }
    let client = OAuthClient::new(client_id.unwrap_or_default(), client_secret);

    if args.timeout.is_zero() {
        return Err(Error::InvalidTimeout.into());
    }
    let mode = resolve_mode(&args.mode, args.no_open, interactive)?;

    let request = LoginRequest::new(client, scopes, Endpoints::google());
    let http = reqwest::Client::new();
    let browser = BrowserOptions {
        open_browser: !args.no_open,
        timeout: args.timeout,
    };
    let tokens = run_login(&http, &request, mode, browser, &ConsoleUi).await?;

    cfg.default_profile = profile.clone();
    cfg.oauth_client = request.client.clone();
    cfg.scopes = request.scopes.clone();
    save_config_in(dir, &cfg)?;

    let expiry = tokens.expiry;
    let store = FileTokenStore::in_dir(dir);
    store.save(&profile, &StoredToken::new(tokens, request.scopes, mode))?;

    println!("Logged in profile {profile:?} using {mode} flow.");
    if request.client.is_public() {
        println!("Client secret: not set (PKCE/public client mode)");
    }
    println!("Token expiry: {}", format_time(expiry));
    Ok(())
}

fn format_time(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(
        || "none".to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn status_json(
    profile: &str,
    record: &StoredToken,
    token_path: &Path,
    now: DateTime<Utc>,
) -> serde_json::Value {
    let refresh_present = record.token.has_refresh_token();
    let has_material = !record.token.access_token().trim().is_empty() || refresh_present;
    serde_json::json!({
        "profile": profile,
        "authenticated": has_material,
        "valid": record.token.is_valid(now),
        "expiry": record.token.expiry,
        "saved_at": record.saved_at,
        "mode": record.mode,
        "scopes": record.scopes,
        "refresh_token_present": refresh_present,
        "token_path": token_path.display().to_string(),
    })
}

fn status_lines(
    profile: &str,
    record: &StoredToken,
    token_path: &Path,
    now: DateTime<Utc>,
) -> Vec<String> {
    let refresh_present = record.token.has_refresh_token();
    let has_material = !record.token.access_token().trim().is_empty() || refresh_present;
    vec![
        format!("Profile: {profile}"),
        format!("Authenticated: {has_material}"),
        format!("Valid now: {}", record.token.is_valid(now)),
        format!("Expiry: {}", format_time(record.token.expiry)),
        format!("Refresh token: {refresh_present}"),
        format!("Saved at: {}", format_time(Some(record.saved_at))),
        format!("Mode: {}", record.mode),
        format!("Scopes: {}", record.scopes.join(", ")),
        format!("Token file: {}", token_path.display()),
    ]
}

fn status(dir: &Path, profile: Option<&str>, json: bool) -> Result<()> {
    let cfg = load_config_in(dir)?;
    let profile = choose_profile(profile, &cfg.default_profile);
    let store = FileTokenStore::in_dir(dir);

    let record = match store.load(&profile) {
        Ok(record) => record,
        Err(e) if e.is_not_authenticated() => {
            if json {
                let out = serde_json::json!({ "profile": profile, "authenticated": false });
                println!("{out}");
            } else {
                println!("Profile {profile:?}: not authenticated");
            }
            return Ok(());
        },
        Err(e) => return Err(e.into()),
    };

    let path = store.token_path(&profile);
    if json {
        let out = status_json(&profile, &record, &path, Utc::now());
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in status_lines(&profile, &record, &path, Utc::now()) {
            println!("{line}");
        }
    }
    Ok(())
}

fn logout(dir: &Path, profile: Option<&str>) -> Result<()> {
    let cfg = load_config_in(dir)?;
    let profile = choose_profile(profile, &cfg.default_profile);
    FileTokenStore::in_dir(dir).delete(&profile)?;
    println!("Removed token for profile {profile:?}");
    Ok(())
}

fn open_session(dir: &Path, profile: Option<&str>) -> Result<AuthSession> {
    let cfg: AppConfig = load_config_in(dir)?;
    let profile = choose_profile(profile, &cfg.default_profile);
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::in_dir(dir));
    Ok(AuthSession::open(
        store,
        &cfg,
        &profile,
        reqwest::Client::new(),
        Endpoints::google(),
    )?)
}

async fn token(dir: &Path, profile: Option<&str>) -> Result<()> {
    let session = open_session(dir, profile)?;
    let access_token = session.access_token().await?;
    session.finish().await?;
    println!("{access_token}");
    Ok(())
}

/// Parse `90s`, `3m`, `1h`, `1m30s`, `250ms` or a bare number of seconds.
fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".into());
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return Err(format!("invalid duration {raw:?}"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;
        rest = &rest[digits..];

        let unit_len = rest.chars().take_while(char::is_ascii_alphabetic).count();
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "" => return Err(format!("missing unit in duration {raw:?}")),
            unit => return Err(format!("unknown unit {unit:?} in duration {raw:?}")),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration {raw:?} is too large"))?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}
