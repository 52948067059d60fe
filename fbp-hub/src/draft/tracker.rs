// Live draft tracking: the draft_active.json snapshot, the pick clock and a
// periodic poller that reports when the pick on the clock changes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::data::{self, DataError, DataSource, DRAFT_ACTIVE_FILE};

pub const DEFAULT_PICK_CLOCK_SECS: u32 = 120;
pub const RECENT_PICKS: usize = 20;
pub const TEAMS_PER_ROUND: u32 = 12;

const CRITICAL_SECS: u32 = 30;
const WARNING_SECS: u32 = 60;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    PreDraft,
    DraftDay,
    ActiveDraft,
    PostDraft,
}

impl DraftStatus {
    /// Unknown or missing statuses read as pre-draft.
    pub fn from_str_status(s: &str) -> Self {
        match s {
            "active_draft" => DraftStatus::ActiveDraft,
            "draft_day" => DraftStatus::DraftDay,
            "post_draft" => DraftStatus::PostDraft,
            _ => DraftStatus::PreDraft,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DraftStatus::PreDraft => "PRE-DRAFT",
            DraftStatus::DraftDay => "DRAFT DAY",
            DraftStatus::ActiveDraft => "ACTIVE DRAFT",
            DraftStatus::PostDraft => "POST-DRAFT",
        }
    }
}

/// A completed selection in the live draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftedPlayer {
    pub round: u32,
    pub pick_number: u32,
    pub team: String,
    pub player_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub mlb_team: String,
    #[serde(default)]
    pub picked_at: Option<String>,
}

/// Contents of draft_active.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDraft {
    /// "keeper" or "prospect".
    #[serde(default)]
    pub draft_type: String,
    #[serde(default)]
    pub season: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_pick: Option<u32>,
    #[serde(default)]
    pub current_round: Option<u32>,
    #[serde(default)]
    pub current_team: Option<String>,
    #[serde(default)]
    pub clock_started_at: Option<String>,
    #[serde(default)]
    pub pick_clock_seconds: Option<u32>,
    #[serde(default)]
    pub total_rounds: u32,
    #[serde(default)]
    pub draft_order: Vec<String>,
    #[serde(default)]
    pub picks: Vec<DraftedPlayer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockUrgency {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickClock {
    pub remaining: u32,
    pub limit: u32,
    pub urgency: ClockUrgency,
}

impl PickClock {
    /// "m:ss".
    pub fn display(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    /// Share of the clock left, 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        f64::from(self.remaining) / f64::from(self.limit)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

impl ActiveDraft {
    pub fn status(&self) -> DraftStatus {
        DraftStatus::from_str_status(&self.status)
    }

    /// "FBP KEEPER DRAFT 2026" or "FBP PROSPECT DRAFT 2026".
    pub fn title(&self) -> String {
        let kind = if self.draft_type == "keeper" {
            "KEEPER"
        } else {
            "PROSPECT"
        };
        format!("FBP {} DRAFT {}", kind, self.season)
    }

    pub fn limit_secs(&self) -> u32 {
        match self.pick_clock_seconds {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_PICK_CLOCK_SECS,
        }
    }

    /// Time left on the current pick. Only runs while the draft is active
    /// and the clock has a start time.
    pub fn pick_clock(&self, now: DateTime<Utc>) -> Option<PickClock> {
        if self.status() != DraftStatus::ActiveDraft {
            return None;
        }
        let started = parse_timestamp(self.clock_started_at.as_deref()?)?;
        let limit = self.limit_secs();
        let elapsed = (now - started).num_seconds().max(0);
        let remaining = u32::try_from((i64::from(limit) - elapsed).max(0)).unwrap_or(0);
        let urgency = if remaining < CRITICAL_SECS {
            ClockUrgency::Critical
        } else if remaining < WARNING_SECS {
            ClockUrgency::Warning
        } else {
            ClockUrgency::Normal
        };
        Some(PickClock {
            remaining,
            limit,
            urgency,
        })
    }

    /// Last picks made, newest first.
    pub fn recent_picks(&self) -> Vec<&DraftedPlayer> {
        self.picks.iter().rev().take(RECENT_PICKS).collect()
    }

    pub fn max_picks(&self) -> u32 {
        self.total_rounds * TEAMS_PER_ROUND
    }

    /// "37 / 312".
    pub fn progress_label(&self) -> String {
        format!("{} / {}", self.picks.len(), self.max_picks())
    }

    pub fn is_on_clock(&self, team: &str) -> bool {
        self.current_team.as_deref() == Some(team)
    }
}

pub async fn fetch_active(source: &dyn DataSource) -> Result<ActiveDraft, DataError> {
    data::load(source, DRAFT_ACTIVE_FILE).await
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DraftEvent {
    /// The pick on the clock changed (or a draft appeared).
    PickAdvanced {
        previous: Option<u32>,
        draft: Box<ActiveDraft>,
    },
    /// draft_active.json went away.
    Ended,
}

/// Re-fetches draft_active.json on a fixed interval and forwards changes.
pub struct DraftPoller {
    source: Arc<dyn DataSource>,
    period: Duration,
    events: mpsc::Sender<DraftEvent>,
}

impl DraftPoller {
    pub fn new(source: Arc<dyn DataSource>, period: Duration, events: mpsc::Sender<DraftEvent>) -> Self {
        DraftPoller {
            source,
            period,
            events,
        }
    }

    /// Poll until the receiver is dropped. `initial` is the snapshot the
    /// caller already has, so an unchanged first poll is silent.
    pub async fn run(self, initial: Option<ActiveDraft>) {
        let mut last = initial.map(|d| d.current_pick);
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        info!("Draft poller started ({:?} interval)", self.period);
        loop {
            interval.tick().await;
            let event = match fetch_active(self.source.as_ref()).await {
                Ok(draft) => {
                    let current = draft.current_pick;
                    let previous = last.replace(current);
                    match previous {
                        Some(prev) if prev == current => None,
                        _ => Some(DraftEvent::PickAdvanced {
                            previous: previous.flatten(),
                            draft: Box::new(draft),
                        }),
                    }
                }
                Err(e) if e.is_not_found() => last.take().map(|_| DraftEvent::Ended),
                Err(e) => {
                    warn!("Draft poll failed: {}", e);
                    None
                }
            };

            if let Some(event) = event {
                debug!("Draft event: {:?}", event);
                if self.events.send(event).await.is_err() {
                    break;
                }
            }
        }
        info!("Draft poller stopped");
    }
}
