// Configuration loading and parsing (league.toml, hub.toml, credentials.toml).

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub server: ServerConfig,
    pub db_path: String,
    pub data: DataConfig,
    pub draft: DraftConfig,
    pub discord: DiscordConfig,
    pub budget: BudgetConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub season: i32,
    /// Maximum number of MLB keepers a team may carry.
    pub roster_limit: usize,
    /// Discord user ids with commissioner rights.
    #[serde(default)]
    pub commissioners: Vec<String>,
    pub teams: Vec<TeamConfig>,
}

/// One franchise: abbreviation, display name, the manager's Discord id and
/// the team's accent colour.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    pub abbr: String,
    pub name: String,
    pub discord_id: String,
    pub color: String,
}

// ---------------------------------------------------------------------------
// hub.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire hub.toml file.
#[derive(Debug, Clone, Deserialize)]
struct HubFile {
    server: ServerConfig,
    database: DatabaseSection,
    data: DataConfig,
    draft: DraftConfig,
    discord: DiscordConfig,
    budget: BudgetConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub dir: String,
    #[serde(default)]
    pub remote_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub api_base: String,
    pub scopes: Vec<String>,
    pub session_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    pub kap_allotment: u32,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub discord_client_id: Option<String>,
    pub discord_client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml`,
/// `config/hub.toml`, and (optionally) `config/credentials.toml`, all
/// relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` handles that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    // --- hub.toml (required) ---
    let hub_path = config_dir.join("hub.toml");
    let hub_text = read_file(&hub_path)?;
    let hub_file: HubFile = toml::from_str(&hub_text).map_err(|e| ConfigError::ParseError {
        path: hub_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league: league_file.league,
        server: hub_file.server,
        db_path: hub_file.database.path,
        data: hub_file.data,
        draft: hub_file.draft,
        discord: hub_file.discord,
        budget: hub_file.budget,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.teams.is_empty() {
        return Err(invalid("league.teams", "at least one team is required"));
    }
    if league.roster_limit == 0 {
        return Err(invalid("league.roster_limit", "must be greater than 0"));
    }

    let mut seen_abbrs = HashSet::new();
    let mut seen_managers = HashSet::new();
    for team in &league.teams {
        if team.abbr.trim().is_empty() {
            return Err(invalid("league.teams.abbr", "must not be empty"));
        }
        if !seen_abbrs.insert(team.abbr.as_str()) {
            return Err(invalid(
                "league.teams.abbr",
                format!("duplicate team abbreviation {}", team.abbr),
            ));
        }
        if !seen_managers.insert(team.discord_id.as_str()) {
            return Err(invalid(
                "league.teams.discord_id",
                format!("discord id {} is mapped to more than one team", team.discord_id),
            ));
        }
        if !team.color.starts_with('#') {
            return Err(invalid(
                "league.teams.color",
                format!("{} colour must be a hex value, got {}", team.abbr, team.color),
            ));
        }
    }

    if config.draft.poll_interval_secs == 0 {
        return Err(invalid("draft.poll_interval_secs", "must be > 0"));
    }
    if config.discord.session_days <= 0 {
        return Err(invalid(
            "discord.session_days",
            format!("must be > 0, got {}", config.discord.session_days),
        ));
    }
    if config.discord.scopes.is_empty() {
        return Err(invalid("discord.scopes", "at least one scope is required"));
    }
    if config.budget.kap_allotment == 0 {
        return Err(invalid("budget.kap_allotment", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
