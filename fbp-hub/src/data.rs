// League data loading: named JSON documents from a local directory, a remote
// base URL, or one falling back to the other.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DataConfig;
use crate::ledger::wizbucks::{balance_sheet, BalanceSheet, LedgerRow};
use crate::league::player::Player;
use crate::league::season::SeasonDates;
use crate::league::standings::Standings;
use crate::league::team::TeamDirectory;

pub const PLAYERS_FILE: &str = "combined_players.json";
pub const STANDINGS_FILE: &str = "standings.json";
pub const WIZBUCKS_FILE: &str = "wizbucks.json";
pub const DRAFT_ACTIVE_FILE: &str = "draft_active.json";
pub const DRAFT_PICKS_FILE: &str = "draft_picks.json";
pub const DRAFT_ORDER_FILE: &str = "draft_order.json";
pub const SEASON_DATES_FILE: &str = "season_dates.json";
pub const LEDGER_HISTORY_FILE: &str = "wizbucks_transactions.json";
pub const TRANSACTIONS_HISTORY_FILE: &str = "transactions_history.json";
pub const PLAYER_LOG_FILE: &str = "player_log.json";
pub const TOP100_FILE: &str = "top100_prospects.json";
pub const AUCTION_FILE: &str = "auction_current.json";

/// Files looked up after the core league data.
pub const SECONDARY_FILES: [&str; 9] = [
    DRAFT_ACTIVE_FILE,
    DRAFT_PICKS_FILE,
    DRAFT_ORDER_FILE,
    SEASON_DATES_FILE,
    LEDGER_HISTORY_FILE,
    TRANSACTIONS_HISTORY_FILE,
    PLAYER_LOG_FILE,
    TOP100_FILE,
    AUCTION_FILE,
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DataError {
    #[error("{name} not found")]
    NotFound { name: String },

    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },

    #[error("request for {name} failed: {source}")]
    Http {
        name: String,
        source: reqwest::Error,
    },

    #[error("request for {name} returned HTTP {status}")]
    Status { name: String, status: u16 },

    #[error("failed to parse {name}: {source}")]
    Parse {
        name: String,
        source: serde_json::Error,
    },

    #[error("invalid data URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Somewhere named JSON documents can be fetched from.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Value, DataError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Documents stored as files in one directory.
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDir { root: root.into() }
    }
}

#[async_trait]
impl DataSource for LocalDir {
    async fn fetch(&self, name: &str) -> Result<Value, DataError> {
        let path = self.root.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(source) => {
                return Err(DataError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| DataError::Parse {
            name: name.to_string(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Documents served under an HTTP base URL.
pub struct RemoteBase {
    base: Url,
    http: reqwest::Client,
}

impl RemoteBase {
    /// A trailing slash is added so names resolve beneath the base path.
    pub fn new(base: &str) -> Result<Self, DataError> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized).map_err(|e| DataError::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        Ok(RemoteBase {
            base,
            http: reqwest::Client::new(),
        })
    }

    pub fn url_for(&self, name: &str) -> Result<Url, DataError> {
        self.base.join(name).map_err(|e| DataError::InvalidUrl {
            url: format!("{}{name}", self.base),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DataSource for RemoteBase {
    async fn fetch(&self, name: &str) -> Result<Value, DataError> {
        let url = self.url_for(name)?;
        let http_err = |source| DataError::Http {
            name: name.to_string(),
            source,
        };
        let resp = self.http.get(url).send().await.map_err(http_err)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::NotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::Status {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(http_err)?;
        serde_json::from_slice(&bytes).map_err(|source| DataError::Parse {
            name: name.to_string(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Try `primary`, then `secondary` on any error.
pub struct Fallback {
    primary: Arc<dyn DataSource>,
    secondary: Arc<dyn DataSource>,
}

impl Fallback {
    pub fn new(primary: Arc<dyn DataSource>, secondary: Arc<dyn DataSource>) -> Self {
        Fallback { primary, secondary }
    }
}

#[async_trait]
impl DataSource for Fallback {
    async fn fetch(&self, name: &str) -> Result<Value, DataError> {
        match self.primary.fetch(name).await {
            Ok(v) => Ok(v),
            Err(e) => {
                debug!(
                    "{} unavailable from {} ({}), trying {}",
                    name,
                    self.primary.describe(),
                    e,
                    self.secondary.describe()
                );
                self.secondary.fetch(name).await
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.primary.describe(), self.secondary.describe())
    }
}

/// Local data directory, backed by the remote base when one is configured.
pub fn source_from_config(config: &DataConfig) -> Result<Arc<dyn DataSource>, DataError> {
    let local: Arc<dyn DataSource> = Arc::new(LocalDir::new(&config.dir));
    match config.remote_base.as_deref().filter(|b| !b.trim().is_empty()) {
        Some(base) => {
            let remote: Arc<dyn DataSource> = Arc::new(RemoteBase::new(base)?);
            Ok(Arc::new(Fallback::new(local, remote)))
        }
        None => Ok(local),
    }
}

// ---------------------------------------------------------------------------
// Typed loading
// ---------------------------------------------------------------------------

pub async fn load<T: DeserializeOwned>(source: &dyn DataSource, name: &str) -> Result<T, DataError> {
    let value = source.fetch(name).await?;
    serde_json::from_value(value).map_err(|source| DataError::Parse {
        name: name.to_string(),
        source,
    })
}

/// Load `name`, logging and substituting the default on any failure.
pub async fn load_or_default<T: DeserializeOwned + Default>(source: &dyn DataSource, name: &str) -> T {
    match load(source, name).await {
        Ok(v) => v,
        Err(e) if e.is_not_found() => {
            debug!("{} not present, using defaults", name);
            T::default()
        }
        Err(e) => {
            warn!("Failed to load {}: {}", name, e);
            T::default()
        }
    }
}

/// Load an array document row by row. Rows that fail to deserialize are
/// logged and skipped so one bad record does not empty the whole list.
pub async fn load_rows<T: DeserializeOwned>(source: &dyn DataSource, name: &str) -> Vec<T> {
    let rows: Vec<Value> = load_or_default(source, name).await;
    let total = rows.len();
    let parsed: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| match serde_json::from_value(row) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping malformed row {} in {}: {}", idx, name, e);
                None
            }
        })
        .collect();
    if parsed.len() < total {
        warn!("{}: kept {} of {} rows", name, parsed.len(), total);
    }
    parsed
}

/// Which of `names` the source can currently serve.
pub async fn check_available(source: &dyn DataSource, names: &[&'static str]) -> Vec<(&'static str, bool)> {
    let results = join_all(names.iter().map(|n| source.fetch(n))).await;
    names.iter().copied().zip(results.iter().map(Result::is_ok)).collect()
}

// ---------------------------------------------------------------------------
// Core league data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LeagueData {
    pub players: Vec<Player>,
    pub standings: Standings,
    /// Full team name to WizBucks balance.
    pub wizbucks: HashMap<String, i64>,
}

impl LeagueData {
    /// Players, standings and balances fetched concurrently. Each failure
    /// leaves that part empty.
    pub async fn load(source: &dyn DataSource) -> Self {
        let (players, standings, wizbucks) = tokio::join!(
            load_rows::<Player>(source, PLAYERS_FILE),
            load_or_default::<Standings>(source, STANDINGS_FILE),
            load_or_default::<HashMap<String, i64>>(source, WIZBUCKS_FILE),
        );
        info!(
            "Loaded league data from {}: {} players, {} standings rows, {} balances",
            source.describe(),
            players.len(),
            standings.standings.len(),
            wizbucks.len()
        );
        LeagueData {
            players,
            standings,
            wizbucks,
        }
    }

    pub fn balance_sheet(&self, teams: &TeamDirectory) -> BalanceSheet {
        balance_sheet(&self.wizbucks, teams, &self.players)
    }

    /// Balance for a team abbreviation, 0 when unlisted.
    pub fn balance_of(&self, teams: &TeamDirectory, abbr: &str) -> i64 {
        self.wizbucks.get(teams.name_of(abbr)).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Secondary documents
// ---------------------------------------------------------------------------

pub async fn load_season_dates(source: &dyn DataSource) -> SeasonDates {
    load_or_default(source, SEASON_DATES_FILE).await
}

pub async fn load_ledger_history(source: &dyn DataSource) -> Vec<LedgerRow> {
    load_rows(source, LEDGER_HISTORY_FILE).await
}

/// Historical transaction export and the live player log, raw.
pub async fn load_player_log_sources(source: &dyn DataSource) -> (Vec<Value>, Vec<Value>) {
    tokio::join!(
        load_or_default::<Vec<Value>>(source, TRANSACTIONS_HISTORY_FILE),
        load_or_default::<Vec<Value>>(source, PLAYER_LOG_FILE),
    )
}

/// UPID to Top-100 rank. Entries without a UPID or a numeric rank are skipped.
pub async fn load_top100(source: &dyn DataSource) -> HashMap<String, u32> {
    let rows: Vec<Value> = load_or_default(source, TOP100_FILE).await;
    top100_map(&rows)
}

fn top100_map(rows: &[Value]) -> HashMap<String, u32> {
    rows.iter()
        .filter_map(|row| {
            let upid = match row.get("upid")? {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let rank = match row.get("rank")? {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            let rank = u32::try_from(rank).ok().filter(|r| *r > 0)?;
            Some((upid, rank))
        })
        .collect()
}
