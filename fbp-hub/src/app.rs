// Application core: the loaded hub (config, data, database) with the budget
// workflows that persist through it, and the event loop that runs the draft
// poller and the OAuth proxy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::discord::DiscordClient;
use crate::budget::kap::{self, KapCalculator, KapRecord, KapSelection};
use crate::budget::pad::{self, kap_rollover_from_pad, PadCalculator, PadRecord, PadSelection};
use crate::config::Config;
use crate::data::{self, DataSource, LeagueData, SECONDARY_FILES};
use crate::db::{Database, SubmissionKind, SubmissionWrite};
use crate::draft::tracker::{self, ActiveDraft, DraftEvent, DraftPoller};
use crate::league::team::TeamDirectory;
use crate::server;

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Everything the budget workflows need: who the teams are, the league
/// snapshot, and where submissions land.
pub struct Hub {
    pub season: i32,
    pub kap_allotment: u32,
    pub teams: TeamDirectory,
    pub db: Database,
    pub source: Arc<dyn DataSource>,
    pub league: LeagueData,
    /// Latest pipeline rank per upid.
    pub top100: HashMap<String, u32>,
}

impl Hub {
    pub fn new(
        season: i32,
        kap_allotment: u32,
        teams: TeamDirectory,
        db: Database,
        source: Arc<dyn DataSource>,
    ) -> Self {
        Hub {
            season,
            kap_allotment,
            teams,
            db,
            source,
            league: LeagueData::default(),
            top100: HashMap::new(),
        }
    }

    /// Build from config and fetch the league snapshot.
    pub async fn load(config: &Config, db: Database) -> anyhow::Result<Self> {
        let source = data::source_from_config(&config.data).context("failed to configure data source")?;
        let mut hub = Hub::new(
            config.league.season,
            config.budget.kap_allotment,
            TeamDirectory::from_config(&config.league),
            db,
            source,
        );
        hub.refresh().await;
        Ok(hub)
    }

    /// Re-fetch players, standings, balances and top-100 ranks.
    pub async fn refresh(&mut self) {
        let source = self.source.as_ref();
        let (league, top100) = tokio::join!(LeagueData::load(source), data::load_top100(source));
        self.league = league;
        self.top100 = top100;
    }

    fn ensure_team(&self, team: &str) -> anyhow::Result<()> {
        if self.teams.get(team).is_none() {
            bail!("unknown team {team}");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // KAP
    // ------------------------------------------------------------------

    /// PAD rollover carried into this team's KAP, from stored PAD records.
    pub fn kap_rollover(&self, team: &str) -> anyhow::Result<u32> {
        let pads = self.db.load_submissions(SubmissionKind::Pad, self.season)?;
        Ok(kap_rollover_from_pad(&pads, &self.teams)
            .get(team)
            .copied()
            .unwrap_or(0))
    }

    /// Calculator for `team` with any saved draft restored.
    pub fn kap_calculator(&self, team: &str) -> anyhow::Result<KapCalculator> {
        self.ensure_team(team)?;
        let mut calc = KapCalculator::new(
            team,
            self.season,
            self.kap_allotment,
            self.kap_rollover(team)?,
            &self.league.players,
        );
        let key = kap::draft_key(team, self.season);
        if let Some(saved) = self.db.load_state(&key)? {
            match serde_json::from_value::<KapSelection>(saved) {
                Ok(selection) => {
                    debug!("Restored KAP draft {}", key);
                    calc.restore(selection);
                }
                Err(e) => warn!("Discarding unreadable KAP draft {}: {}", key, e),
            }
        }
        Ok(calc)
    }

    pub fn save_kap_draft(&self, team: &str, calc: &KapCalculator) -> anyhow::Result<()> {
        let value = serde_json::to_value(calc.selection()).context("failed to serialize KAP draft")?;
        self.db.save_state(&kap::draft_key(team, self.season), &value)
    }

    /// Validate, then write the record, ledger and player log atomically.
    pub fn submit_kap(&self, team: &str, calc: &KapCalculator, now: DateTime<Utc>) -> anyhow::Result<KapRecord> {
        self.ensure_team(team)?;
        if self.db.has_submission(SubmissionKind::Kap, team, self.season)? {
            bail!("{team} already submitted KAP for {}", self.season);
        }
        let submission = calc.submit(now)?;
        let record = serde_json::to_value(&submission.record).context("failed to serialize KAP record")?;
        self.db.commit_submission(&SubmissionWrite {
            kind: SubmissionKind::Kap,
            team,
            season: self.season,
            record: &record,
            transactions: &submission.transactions,
            player_log: &submission.player_log,
            draft_key: &kap::draft_key(team, self.season),
        })?;
        info!(
            "KAP submitted for {}: {} keepers, ${} spent",
            team,
            submission.record.keepers.len(),
            submission.record.spending.total
        );
        Ok(submission.record)
    }

    // ------------------------------------------------------------------
    // PAD
    // ------------------------------------------------------------------

    pub fn pad_calculator(&self, team: &str) -> anyhow::Result<PadCalculator> {
        self.ensure_team(team)?;
        let mut calc = PadCalculator::new(
            team,
            self.season,
            self.league.standings.rank_of(team),
            self.league.balance_of(&self.teams, team),
            &self.league.players,
            &self.top100,
        );
        let key = pad::draft_key(team, self.season);
        if let Some(saved) = self.db.load_state(&key)? {
            match serde_json::from_value::<PadSelection>(saved) {
                Ok(selection) => {
                    debug!("Restored PAD draft {}", key);
                    calc.restore(selection);
                }
                Err(e) => warn!("Discarding unreadable PAD draft {}: {}", key, e),
            }
        }
        Ok(calc)
    }

    pub fn save_pad_draft(&self, team: &str, calc: &PadCalculator) -> anyhow::Result<()> {
        let value = serde_json::to_value(calc.selection()).context("failed to serialize PAD draft")?;
        self.db.save_state(&pad::draft_key(team, self.season), &value)
    }

    pub fn submit_pad(&self, team: &str, calc: &PadCalculator, now: DateTime<Utc>) -> anyhow::Result<PadRecord> {
        self.ensure_team(team)?;
        if self.db.has_submission(SubmissionKind::Pad, team, self.season)? {
            bail!("{team} already submitted PAD for {}", self.season);
        }
        let submission = calc.submit(now)?;
        let record = serde_json::to_value(&submission.record).context("failed to serialize PAD record")?;
        self.db.commit_submission(&SubmissionWrite {
            kind: SubmissionKind::Pad,
            team,
            season: self.season,
            record: &record,
            transactions: &submission.transactions,
            player_log: &submission.player_log,
            draft_key: &pad::draft_key(team, self.season),
        })?;
        info!(
            "PAD submitted for {}: {} contracts, ${} spent, ${} to KAP",
            team,
            submission.record.allocations.prospects.len(),
            submission.record.spending.total,
            submission.record.spending.rollover
        );
        Ok(submission.record)
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

fn log_draft_event(event: &DraftEvent) {
    match event {
        DraftEvent::PickAdvanced { previous, draft } => {
            let on_clock = draft.current_team.as_deref().unwrap_or("-");
            let current = draft
                .current_pick
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            match previous {
                Some(prev) => info!(
                    "{}: pick {} -> {}, {} made ({} on the clock)",
                    draft.title(),
                    prev,
                    current,
                    draft.progress_label(),
                    on_clock
                ),
                None => info!("{}: pick {} ({} on the clock)", draft.title(), current, on_clock),
            }
        }
        DraftEvent::Ended => info!("Draft is no longer active"),
    }
}

/// Load everything, start the poller and the proxy, and run until Ctrl+C or
/// until the poller goes away.
pub async fn run(config: Config, db: Database) -> anyhow::Result<()> {
    let hub = Hub::load(&config, db).await?;
    let source = Arc::clone(&hub.source);

    for (name, available) in data::check_available(source.as_ref(), &SECONDARY_FILES).await {
        if available {
            debug!("{} available", name);
        } else {
            info!("{} not available from {}", name, source.describe());
        }
    }

    let initial: Option<ActiveDraft> = match tracker::fetch_active(source.as_ref()).await {
        Ok(draft) => {
            info!("{} ({})", draft.title(), draft.status().label());
            Some(draft)
        }
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            warn!("Could not read active draft: {}", e);
            None
        }
    };

    let (draft_tx, mut draft_rx) = mpsc::channel(32);
    let period = Duration::from_secs(config.draft.poll_interval_secs.max(1));
    let poller = DraftPoller::new(Arc::clone(&source), period, draft_tx);
    let poller_handle = tokio::spawn(poller.run(initial));

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let discord = DiscordClient::from_config(&config.discord, &config.credentials);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run(&addr, discord).await {
            error!("OAuth proxy on {} failed: {}", addr, e);
        }
    });

    info!(
        "Application event loop started: {} {} ({} teams)",
        config.league.name,
        hub.season,
        hub.teams.len()
    );

    loop {
        tokio::select! {
            event = draft_rx.recv() => {
                match event {
                    Some(event) => log_draft_event(&event),
                    None => {
                        info!("Draft poller channel closed, shutting down");
                        break;
                    }
                }
            }

            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    poller_handle.abort();
    server_handle.abort();
    info!("Application event loop exited");
    Ok(())
}
