// Player change log: entries written by submissions, and the merged view over
// the historical export plus the live log.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::league::player::Player;

use super::generate_id;
use super::wizbucks::LEDGER_SOURCE;

pub const SOURCE_HISTORY: &str = "history";
pub const SOURCE_PLAYER_LOG: &str = "player_log";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedTransactions {
    pub wizbucks_txn_id: Option<String>,
}

/// One change record as appended by a PAD or KAP submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLogEntry {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub season: i32,
    pub source: String,
    #[serde(default)]
    pub admin: String,
    pub upid: String,
    pub player_name: String,
    pub team: String,
    pub pos: String,
    pub age: Option<u32>,
    pub level: String,
    pub owner: String,
    pub update_type: String,
    /// Free-form `{field: {from, to}}` map.
    pub changes: Value,
    pub event: String,
    #[serde(default)]
    pub related_transactions: RelatedTransactions,
}

impl PlayerLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player: &Player,
        owner: &str,
        season: i32,
        update_type: &str,
        changes: Value,
        event: String,
        wizbucks_txn_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        PlayerLogEntry {
            log_id: generate_id("player", now),
            timestamp: now,
            season,
            source: LEDGER_SOURCE.to_string(),
            admin: String::new(),
            upid: player.upid.clone(),
            player_name: player.name.clone(),
            team: player.team.clone(),
            pos: player.position.clone(),
            age: player.age,
            level: player.level.clone().unwrap_or_default(),
            owner: owner.to_string(),
            update_type: update_type.to_string(),
            changes,
            event,
            related_transactions: RelatedTransactions { wizbucks_txn_id },
        }
    }
}

// ---------------------------------------------------------------------------
// Merged view
// ---------------------------------------------------------------------------

/// A log row after alias normalisation. Older exports use camelCase keys and
/// `position` instead of `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub id: String,
    pub season: Option<i64>,
    pub source: String,
    pub timestamp: String,
    pub upid: String,
    pub player_name: String,
    pub team: String,
    pub pos: String,
    pub age: Option<u32>,
    pub level: String,
    pub player_type: String,
    pub owner: String,
    pub contract: String,
    pub status: String,
    pub update_type: String,
    pub event: String,
}

fn text(rec: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| rec.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn season_of(rec: &Value) -> Option<i64> {
    match rec.get("season")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl LogRecord {
    pub fn normalize(rec: &Value, fallback_source: &str) -> Self {
        let source = text(rec, &["source"]);
        LogRecord {
            id: text(rec, &["id", "log_id"]),
            season: season_of(rec),
            source: if source.is_empty() { fallback_source.to_string() } else { source },
            timestamp: text(rec, &["timestamp"]),
            upid: text(rec, &["upid"]),
            player_name: text(rec, &["player_name", "playerName"]),
            team: text(rec, &["team"]),
            pos: text(rec, &["pos", "position"]),
            age: rec.get("age").and_then(Value::as_u64).and_then(|a| u32::try_from(a).ok()),
            level: text(rec, &["level"]),
            player_type: text(rec, &["player_type", "playerType"]),
            owner: text(rec, &["owner"]),
            contract: text(rec, &["contract"]),
            status: text(rec, &["status"]),
            update_type: text(rec, &["update_type", "updateType"]),
            event: text(rec, &["event"]),
        }
    }

    /// Millisecond sort key. Missing or unparseable timestamps sort last.
    fn sort_key(&self) -> i64 {
        let ts = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return dt.timestamp_millis();
        }
        NaiveDate::parse_from_str(ts.get(..10).unwrap_or(ts), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0)
    }

    fn haystack(&self) -> String {
        [
            self.player_name.as_str(),
            self.team.as_str(),
            self.owner.as_str(),
            self.update_type.as_str(),
            self.event.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// Normalise both sources, tag their origin and sort newest first.
pub fn merge(history: &[Value], live: &[Value]) -> Vec<LogRecord> {
    let mut all: Vec<LogRecord> = history
        .iter()
        .map(|r| LogRecord::normalize(r, SOURCE_HISTORY))
        .chain(live.iter().map(|r| LogRecord::normalize(r, SOURCE_PLAYER_LOG)))
        .collect();
    all.sort_by_key(|r| std::cmp::Reverse(r.sort_key()));
    all
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub season: Option<String>,
    pub owner: Option<String>,
    pub update_type: Option<String>,
    pub search: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, rec: &LogRecord) -> bool {
        if let Some(season) = self.season.as_deref() {
            if rec.season.map(|s| s.to_string()).as_deref() != Some(season) {
                return false;
            }
        }
        if self.owner.as_deref().is_some_and(|o| rec.owner != o) {
            return false;
        }
        if self.update_type.as_deref().is_some_and(|t| rec.update_type != t) {
            return false;
        }
        match self.search.as_deref().map(|s| s.trim().to_lowercase()) {
            Some(needle) if !needle.is_empty() => rec.haystack().contains(&needle),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, records: &'a [LogRecord]) -> Vec<&'a LogRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Dropdown contents for the log filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Newest season first.
    pub seasons: Vec<i64>,
    pub owners: Vec<String>,
    pub update_types: Vec<String>,
}

pub fn filter_options(records: &[LogRecord]) -> FilterOptions {
    let mut seasons = BTreeSet::new();
    let mut owners = BTreeSet::new();
    let mut types = BTreeSet::new();
    for r in records {
        if let Some(s) = r.season {
            seasons.insert(s);
        }
        if !r.owner.is_empty() {
            owners.insert(r.owner.clone());
        }
        if !r.update_type.is_empty() {
            types.insert(r.update_type.clone());
        }
    }
    FilterOptions {
        seasons: seasons.into_iter().rev().collect(),
        owners: owners.into_iter().collect(),
        update_types: types.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::player::tests::player;
    use crate::league::player::PlayerType;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Vec<LogRecord> {
        let history = vec![
            json!({"season": 2024, "timestamp": "2024-03-01", "playerName": "Old Guy",
                   "position": "C", "owner": "HAM", "updateType": "Trade"}),
            json!({"season": "2025", "player_name": "No Date", "owner": "WIZ",
                   "update_type": "Waiver"}),
        ];
        let live = vec![json!({
            "log_id": "player_1_abcdefgh", "season": 2026, "source": "fbp_hub",
            "timestamp": "2026-02-10T18:00:00Z", "player_name": "New Kid",
            "team": "SEA", "owner": "WIZ", "update_type": "contract_assigned",
            "event": "Assigned PC contract"
        })];
        merge(&history, &live)
    }

    #[test]
    fn merge_normalizes_aliases_and_sorts_newest_first() {
        let records = sample();
        let names: Vec<&str> = records.iter().map(|r| r.player_name.as_str()).collect();
        assert_eq!(names, vec!["New Kid", "Old Guy", "No Date"]);

        assert_eq!(records[1].pos, "C");
        assert_eq!(records[1].update_type, "Trade");
        assert_eq!(records[1].source, SOURCE_HISTORY);
        assert_eq!(records[0].source, "fbp_hub");
        assert_eq!(records[0].id, "player_1_abcdefgh");
        assert_eq!(records[2].season, Some(2025));
    }

    #[test]
    fn filters_combine() {
        let records = sample();
        let by_owner = LogFilter {
            owner: Some("WIZ".into()),
            ..Default::default()
        };
        assert_eq!(by_owner.apply(&records).len(), 2);

        let by_season = LogFilter {
            season: Some("2024".into()),
            ..Default::default()
        };
        assert_eq!(by_season.apply(&records)[0].player_name, "Old Guy");

        let search = LogFilter {
            search: Some(" assigned pc ".into()),
            ..Default::default()
        };
        assert_eq!(search.apply(&records).len(), 1);

        let search_team = LogFilter {
            search: Some("sea".into()),
            update_type: Some("Trade".into()),
            ..Default::default()
        };
        assert!(search_team.apply(&records).is_empty());
    }

    #[test]
    fn option_lists() {
        let opts = filter_options(&sample());
        assert_eq!(opts.seasons, vec![2026, 2025, 2024]);
        assert_eq!(opts.owners, vec!["HAM", "WIZ"]);
        assert_eq!(opts.update_types, vec!["Trade", "Waiver", "contract_assigned"]);
    }

    #[test]
    fn entry_copies_player_fields() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut p = player("77", "Prospect Pete", "HAM", PlayerType::Farm, "");
        p.level = Some("AA".into());
        let entry = PlayerLogEntry::new(
            &p,
            "HAM",
            2026,
            "contract_assigned",
            json!({"contract_type": {"from": null, "to": "PC"}}),
            "Assigned PC contract".into(),
            Some("wb_1_aaaaaaaa".into()),
            now,
        );
        assert!(entry.log_id.starts_with("player_"));
        assert_eq!(entry.level, "AA");
        assert_eq!(entry.pos, "SS");
        assert_eq!(entry.source, LEDGER_SOURCE);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["related_transactions"]["wizbucks_txn_id"], "wb_1_aaaaaaaa");
        let rec = LogRecord::normalize(&value, SOURCE_PLAYER_LOG);
        assert_eq!(rec.player_name, "Prospect Pete");
        assert_eq!(rec.season, Some(2026));
    }
}
