// SQLite persistence: WizBucks ledger, player log, PAD/KAP submissions and
// key-value hub state (in-progress budget drafts).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::ledger::player_log::PlayerLogEntry;
use crate::ledger::wizbucks::{Installment, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Pad,
    Kap,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Pad => "pad",
            SubmissionKind::Kap => "kap",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a confirmed submission writes, committed together.
pub struct SubmissionWrite<'a> {
    pub kind: SubmissionKind,
    pub team: &'a str,
    pub season: i32,
    pub record: &'a Value,
    pub transactions: &'a [Transaction],
    pub player_log: &'a [PlayerLogEntry],
    /// Saved-draft key cleared once the submission lands.
    pub draft_key: &'a str,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS wizbucks_ledger (
                txn_id           TEXT PRIMARY KEY,
                timestamp        TEXT NOT NULL,
                team             TEXT NOT NULL,
                installment      TEXT NOT NULL,
                amount           INTEGER NOT NULL,
                balance_after    INTEGER NOT NULL,
                transaction_type TEXT NOT NULL,
                season           INTEGER NOT NULL,
                payload          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS player_log (
                log_id      TEXT PRIMARY KEY,
                timestamp   TEXT NOT NULL,
                season      INTEGER NOT NULL,
                upid        TEXT NOT NULL,
                owner       TEXT NOT NULL,
                update_type TEXT NOT NULL,
                payload     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS submissions (
                kind         TEXT NOT NULL,
                team         TEXT NOT NULL,
                season       INTEGER NOT NULL,
                payload      TEXT NOT NULL,
                submitted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (kind, team, season)
            );

            CREATE TABLE IF NOT EXISTS hub_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_team ON wizbucks_ledger(team, installment);
            CREATE INDEX IF NOT EXISTS idx_player_log_season ON player_log(season);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    pub fn append_transactions(&self, txns: &[Transaction]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin ledger transaction")?;
        insert_transactions(&tx, txns)?;
        tx.commit().context("failed to commit ledger transaction")?;
        Ok(())
    }

    /// Ledger lines in insertion order, optionally for one team.
    pub fn load_transactions(&self, team: Option<&str>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM wizbucks_ledger
                 WHERE ?1 IS NULL OR team = ?1
                 ORDER BY rowid",
            )
            .context("failed to prepare load_transactions query")?;
        let payloads = stmt
            .query_map(params![team], |row| row.get::<_, String>(0))
            .context("failed to query ledger")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read ledger rows")?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).context("failed to deserialize ledger row"))
            .collect()
    }

    /// Balance after the most recent charge for a team's installment.
    pub fn team_balance(&self, team: &str, installment: Installment) -> Result<Option<i64>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT balance_after FROM wizbucks_ledger
             WHERE team = ?1 AND installment = ?2
             ORDER BY rowid DESC LIMIT 1",
            params![team, installment.as_str()],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query team balance")
    }

    // ------------------------------------------------------------------
    // Player log
    // ------------------------------------------------------------------

    pub fn append_player_log(&self, entries: &[PlayerLogEntry]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin player log transaction")?;
        insert_player_log(&tx, entries)?;
        tx.commit().context("failed to commit player log")?;
        Ok(())
    }

    /// Raw log entries, newest first, ready for merging with the history
    /// export.
    pub fn load_player_log(&self, season: Option<i32>) -> Result<Vec<Value>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM player_log
                 WHERE ?1 IS NULL OR season = ?1
                 ORDER BY timestamp DESC, rowid DESC",
            )
            .context("failed to prepare load_player_log query")?;
        let payloads = stmt
            .query_map(params![season], |row| row.get::<_, String>(0))
            .context("failed to query player log")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read player log rows")?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).context("failed to deserialize player log row"))
            .collect()
    }

    // ------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------

    /// Store (or replace) a team's submission record for the season.
    pub fn save_submission(&self, kind: SubmissionKind, team: &str, season: i32, record: &Value) -> Result<()> {
        let conn = self.conn()?;
        upsert_submission(&conn, kind, team, season, record)
    }

    /// Team abbreviation to submission record for one kind and season.
    pub fn load_submissions(&self, kind: SubmissionKind, season: i32) -> Result<BTreeMap<String, Value>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT team, payload FROM submissions WHERE kind = ?1 AND season = ?2")
            .context("failed to prepare load_submissions query")?;
        let rows = stmt
            .query_map(params![kind.as_str(), season], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query submissions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read submission rows")?;

        rows.into_iter()
            .map(|(team, payload)| {
                let value = serde_json::from_str(&payload)
                    .with_context(|| format!("failed to deserialize {kind} submission for {team}"))?;
                Ok((team, value))
            })
            .collect()
    }

    pub fn has_submission(&self, kind: SubmissionKind, team: &str, season: i32) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM submissions WHERE kind = ?1 AND team = ?2 AND season = ?3",
                params![kind.as_str(), team, season],
                |row| row.get(0),
            )
            .context("failed to count submissions")?;
        Ok(count > 0)
    }

    /// Ledger lines, log entries and the record in one SQLite transaction,
    /// then drop the team's saved draft.
    pub fn commit_submission(&self, write: &SubmissionWrite<'_>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin submission transaction")?;
        insert_transactions(&tx, write.transactions)?;
        insert_player_log(&tx, write.player_log)?;
        upsert_submission(&tx, write.kind, write.team, write.season, write.record)?;
        tx.execute("DELETE FROM hub_state WHERE key = ?1", params![write.draft_key])
            .context("failed to clear saved draft")?;
        tx.commit().context("failed to commit submission")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key-value state
    // ------------------------------------------------------------------

    /// Persist a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn()?;
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO hub_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    pub fn load_state(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM hub_state WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .context("failed to query hub state")?;
        raw.map(|s| serde_json::from_str(&s).context("failed to deserialize state value"))
            .transpose()
    }

    pub fn delete_state(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM hub_state WHERE key = ?1", params![key])
            .context("failed to delete state")?;
        Ok(())
    }
}

fn insert_transactions(conn: &Connection, txns: &[Transaction]) -> Result<()> {
    for txn in txns {
        let payload = serde_json::to_string(txn).context("failed to serialize transaction")?;
        conn.execute(
            "INSERT INTO wizbucks_ledger
                (txn_id, timestamp, team, installment, amount, balance_after, transaction_type, season, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                txn.txn_id,
                txn.timestamp.to_rfc3339(),
                txn.team,
                txn.installment.as_str(),
                txn.amount,
                txn.balance_after,
                txn.transaction_type.as_str(),
                txn.metadata.season,
                payload,
            ],
        )
        .with_context(|| format!("failed to insert transaction {}", txn.txn_id))?;
    }
    Ok(())
}

fn insert_player_log(conn: &Connection, entries: &[PlayerLogEntry]) -> Result<()> {
    for entry in entries {
        let payload = serde_json::to_string(entry).context("failed to serialize player log entry")?;
        conn.execute(
            "INSERT INTO player_log (log_id, timestamp, season, upid, owner, update_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.log_id,
                entry.timestamp.to_rfc3339(),
                entry.season,
                entry.upid,
                entry.owner,
                entry.update_type,
                payload,
            ],
        )
        .with_context(|| format!("failed to insert player log entry {}", entry.log_id))?;
    }
    Ok(())
}

fn upsert_submission(
    conn: &Connection,
    kind: SubmissionKind,
    team: &str,
    season: i32,
    record: &Value,
) -> Result<()> {
    let payload = serde_json::to_string(record).context("failed to serialize submission")?;
    conn.execute(
        "INSERT OR REPLACE INTO submissions (kind, team, season, payload) VALUES (?1, ?2, ?3, ?4)",
        params![kind.as_str(), team, season, payload],
    )
    .context("failed to save submission")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::wizbucks::{LedgerWriter, TransactionType};
    use crate::league::player::tests::player;
    use crate::league::player::PlayerType;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn charges(team: &str, opening: i64) -> Vec<Transaction> {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut ledger = LedgerWriter::new(team, Installment::Pad, 2026, opening, now);
        ledger.charge(TransactionType::DcSlotPurchase, 5, "DC slot".into(), None);
        ledger.charge(TransactionType::BcSlotPurchase, 20, "BC slot".into(), None);
        ledger.finish()
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(tables, vec!["hub_state", "player_log", "submissions", "wizbucks_ledger"]);
    }

    #[test]
    fn ledger_round_trip_and_balance() {
        let db = test_db();
        db.append_transactions(&charges("HAM", 100)).unwrap();
        db.append_transactions(&charges("WIZ", 140)).unwrap();

        let ham = db.load_transactions(Some("HAM")).unwrap();
        assert_eq!(ham.len(), 2);
        assert_eq!(ham[1].balance_after, 75);
        assert_eq!(db.load_transactions(None).unwrap().len(), 4);

        assert_eq!(db.team_balance("WIZ", Installment::Pad).unwrap(), Some(115));
        assert_eq!(db.team_balance("WIZ", Installment::Kap).unwrap(), None);
        assert_eq!(db.team_balance("B2J", Installment::Pad).unwrap(), None);
    }

    #[test]
    fn duplicate_transaction_ids_are_rejected_atomically() {
        let db = test_db();
        let txns = charges("HAM", 100);
        db.append_transactions(&txns).unwrap();
        assert!(db.append_transactions(&txns).is_err());
        assert_eq!(db.load_transactions(None).unwrap().len(), 2);
    }

    #[test]
    fn player_log_filters_by_season() {
        let db = test_db();
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let p = player("7", "Kid", "HAM", PlayerType::Farm, "");
        let entry = |season| {
            PlayerLogEntry::new(&p, "HAM", season, "contract_assigned", json!({}), "Assigned DC".into(), None, now)
        };
        db.append_player_log(&[entry(2025), entry(2026)]).unwrap();

        assert_eq!(db.load_player_log(None).unwrap().len(), 2);
        let current = db.load_player_log(Some(2026)).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0]["season"], 2026);
    }

    #[test]
    fn submissions_replace_per_team_and_season() {
        let db = test_db();
        db.save_submission(SubmissionKind::Pad, "HAM", 2026, &json!({"v": 1})).unwrap();
        db.save_submission(SubmissionKind::Pad, "HAM", 2026, &json!({"v": 2})).unwrap();
        db.save_submission(SubmissionKind::Pad, "WIZ", 2025, &json!({"v": 3})).unwrap();
        db.save_submission(SubmissionKind::Kap, "WIZ", 2026, &json!({"v": 4})).unwrap();

        let pad = db.load_submissions(SubmissionKind::Pad, 2026).unwrap();
        assert_eq!(pad.len(), 1);
        assert_eq!(pad["HAM"]["v"], 2);
        assert!(db.has_submission(SubmissionKind::Kap, "WIZ", 2026).unwrap());
        assert!(!db.has_submission(SubmissionKind::Kap, "HAM", 2026).unwrap());
    }

    #[test]
    fn commit_submission_writes_everything_and_clears_draft() {
        let db = test_db();
        db.save_state("pad_draft_HAM_2026", &json!({"contracts": {}})).unwrap();
        let txns = charges("HAM", 100);
        let record = json!({"team": "HAM"});
        db.commit_submission(&SubmissionWrite {
            kind: SubmissionKind::Pad,
            team: "HAM",
            season: 2026,
            record: &record,
            transactions: &txns,
            player_log: &[],
            draft_key: "pad_draft_HAM_2026",
        })
        .unwrap();

        assert_eq!(db.load_transactions(Some("HAM")).unwrap().len(), 2);
        assert!(db.has_submission(SubmissionKind::Pad, "HAM", 2026).unwrap());
        assert!(db.load_state("pad_draft_HAM_2026").unwrap().is_none());
    }

    #[test]
    fn state_save_load_delete() {
        let db = test_db();
        assert!(db.load_state("k").unwrap().is_none());
        db.save_state("k", &json!({"a": [1, 2]})).unwrap();
        db.save_state("k", &json!({"a": [3]})).unwrap();
        assert_eq!(db.load_state("k").unwrap(), Some(json!({"a": [3]})));
        db.delete_state("k").unwrap();
        assert!(db.load_state("k").unwrap().is_none());
    }
}
