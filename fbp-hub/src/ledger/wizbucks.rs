// WizBucks transactions: the running-balance writer used by submissions, the
// historical ledger query, balance sheet and CSV export.

use std::collections::HashMap;
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::league::player::Player;
use crate::league::team::TeamDirectory;

use super::generate_id;

/// `metadata.source` stamped on every transaction written by the hub.
pub const LEDGER_SOURCE: &str = "fbp_hub";

/// Rows revealed per "load more" step in the ledger view.
pub const PAGE_SIZE: usize = 50;

// ---------------------------------------------------------------------------
// Transaction records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    KeeperSalary,
    KeeperSalaryIl,
    ReduceTier,
    RoundBuyin,
    RolloverToApa,
    DcPurchase,
    PcPurchase,
    BcPurchase,
    DcSlotPurchase,
    BcSlotPurchase,
    RolloverToKap,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::KeeperSalary => "keeper_salary",
            TransactionType::KeeperSalaryIl => "keeper_salary_il",
            TransactionType::ReduceTier => "reduce_tier",
            TransactionType::RoundBuyin => "round_buyin",
            TransactionType::RolloverToApa => "rollover_to_apa",
            TransactionType::DcPurchase => "dc_purchase",
            TransactionType::PcPurchase => "pc_purchase",
            TransactionType::BcPurchase => "bc_purchase",
            TransactionType::DcSlotPurchase => "dc_slot_purchase",
            TransactionType::BcSlotPurchase => "bc_slot_purchase",
            TransactionType::RolloverToKap => "rollover_to_kap",
        }
    }

    pub fn from_str_type(s: &str) -> Option<Self> {
        [
            TransactionType::KeeperSalary,
            TransactionType::KeeperSalaryIl,
            TransactionType::ReduceTier,
            TransactionType::RoundBuyin,
            TransactionType::RolloverToApa,
            TransactionType::DcPurchase,
            TransactionType::PcPurchase,
            TransactionType::BcPurchase,
            TransactionType::DcSlotPurchase,
            TransactionType::BcSlotPurchase,
            TransactionType::RolloverToKap,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }
}

/// Which seasonal installment a transaction draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Installment {
    Pad,
    Kap,
}

impl Installment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Installment::Pad => "pad",
            Installment::Kap => "kap",
        }
    }

    pub fn from_str_installment(s: &str) -> Option<Self> {
        match s {
            "pad" => Some(Installment::Pad),
            "kap" => Some(Installment::Kap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedPlayer {
    pub upid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnMetadata {
    pub season: i32,
    pub source: String,
}

/// One ledger line. `amount` is signed; charges are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub timestamp: DateTime<Utc>,
    pub team: String,
    pub installment: Installment,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub transaction_type: TransactionType,
    pub description: String,
    pub related_player: Option<RelatedPlayer>,
    pub metadata: TxnMetadata,
}

/// Appends charges against a running balance for one team and installment.
pub struct LedgerWriter {
    team: String,
    installment: Installment,
    season: i32,
    now: DateTime<Utc>,
    balance: i64,
    transactions: Vec<Transaction>,
}

impl LedgerWriter {
    pub fn new(
        team: &str,
        installment: Installment,
        season: i32,
        opening_balance: i64,
        now: DateTime<Utc>,
    ) -> Self {
        LedgerWriter {
            team: team.to_string(),
            installment,
            season,
            now,
            balance: opening_balance,
            transactions: Vec::new(),
        }
    }

    /// Debit `cost` and return the new transaction id.
    pub fn charge(
        &mut self,
        kind: TransactionType,
        cost: u32,
        description: String,
        related_player: Option<RelatedPlayer>,
    ) -> String {
        let before = self.balance;
        let after = before - i64::from(cost);
        let txn = Transaction {
            txn_id: generate_id("wb", self.now),
            timestamp: self.now,
            team: self.team.clone(),
            installment: self.installment,
            amount: -i64::from(cost),
            balance_before: before,
            balance_after: after,
            transaction_type: kind,
            description,
            related_player,
            metadata: TxnMetadata {
                season: self.season,
                source: LEDGER_SOURCE.to_string(),
            },
        };
        let id = txn.txn_id.clone();
        self.balance = after;
        self.transactions.push(txn);
        id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn finish(self) -> Vec<Transaction> {
        self.transactions
    }
}

// ---------------------------------------------------------------------------
// Historical ledger (wizbucks_transactions.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub credit: i64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub debit: i64,
    #[serde(default)]
    pub manager: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub balance: i64,
    #[serde(default)]
    pub related_player: Option<RelatedPlayer>,
}

/// Amounts arrive as integers, floats, numeric strings or null; anything
/// unreadable counts as 0.
fn lenient_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)).unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().map(|f| f.round() as i64).unwrap_or(0),
        _ => 0,
    })
}

impl LedgerRow {
    fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.get(..10).unwrap_or(&self.date), "%Y-%m-%d").ok()
    }
}

/// Badge category for a free-text ledger action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Pc,
    DcSlot,
    Trade,
    Waiver,
    Refund,
    BuyIn,
    Admin,
    Other,
}

/// Partial match, first hit wins.
pub fn action_class(action: &str) -> ActionClass {
    const TABLE: &[(&str, ActionClass)] = &[
        ("PC", ActionClass::Pc),
        ("DC Slot", ActionClass::DcSlot),
        ("Trade", ActionClass::Trade),
        ("Waiver", ActionClass::Waiver),
        ("Refund", ActionClass::Refund),
        ("Buy-In RD", ActionClass::BuyIn),
        ("Admin Add", ActionClass::Admin),
    ];
    TABLE
        .iter()
        .find(|(key, _)| action.contains(key))
        .map(|&(_, class)| class)
        .unwrap_or(ActionClass::Other)
}

#[derive(Debug, Clone)]
pub struct LedgerQuery {
    pub manager: Option<String>,
    pub action: Option<String>,
    pub search: Option<String>,
    pub newest_first: bool,
    /// Number of "load more" steps taken; 1 shows the first page.
    pub pages: usize,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        LedgerQuery {
            manager: None,
            action: None,
            search: None,
            newest_first: true,
            pages: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerPage<'a> {
    pub rows: Vec<&'a LedgerRow>,
    /// Rows matching the filters before paging.
    pub total: usize,
    pub has_more: bool,
}

/// Filter, sort and page the historical ledger.
pub fn query_ledger<'a>(rows: &'a [LedgerRow], query: &LedgerQuery) -> LedgerPage<'a> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut matched: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| query.manager.as_deref().is_none_or(|m| r.manager == m))
        .filter(|r| query.action.as_deref().is_none_or(|a| r.action == a))
        .filter(|r| {
            needle.as_deref().is_none_or(|n| {
                r.note.to_lowercase().contains(n) || r.action.to_lowercase().contains(n)
            })
        })
        .collect();

    matched.sort_by_key(|r| r.parsed_date());
    if query.newest_first {
        matched.reverse();
    }

    let total = matched.len();
    let limit = query.pages.max(1) * PAGE_SIZE;
    matched.truncate(limit);
    LedgerPage {
        rows: matched,
        total,
        has_more: total > limit,
    }
}

/// Write rows as CSV with every cell quoted.
pub fn export_csv<W: Write>(rows: &[&LedgerRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);
    wtr.write_record(["Action", "Note", "Date", "Credit", "Debit", "Manager", "Balance"])?;
    for r in rows {
        wtr.write_record([
            r.action.clone(),
            r.note.clone(),
            r.date.clone(),
            r.credit.to_string(),
            r.debit.to_string(),
            r.manager.clone(),
            r.balance.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("fbp-wizbucks-ledger-{}.csv", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Balance sheet (wizbucks.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub name: String,
    pub abbr: String,
    pub balance: i64,
    /// Farm players on a purchased contract.
    pub pc_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSheet {
    pub entries: Vec<BalanceEntry>,
    pub total: i64,
}

/// Map full-name balances to abbreviations, richest team first.
pub fn balance_sheet(
    balances: &HashMap<String, i64>,
    teams: &TeamDirectory,
    players: &[Player],
) -> BalanceSheet {
    let mut entries: Vec<BalanceEntry> = balances
        .iter()
        .map(|(name, &balance)| {
            let abbr = teams.abbr_for_name(name).unwrap_or(name).to_string();
            let pc_count = players
                .iter()
                .filter(|p| p.fbp_team.as_deref() == Some(abbr.as_str()) && p.is_farm())
                .filter(|p| {
                    p.years_simple.as_deref().is_some_and(|y| y.contains("PC"))
                        || p.contract_type.as_deref().is_some_and(|c| c.contains("Purchased"))
                })
                .count();
            BalanceEntry {
                name: name.clone(),
                abbr,
                balance,
                pc_count,
            }
        })
        .collect();
    entries.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.abbr.cmp(&b.abbr)));
    let total = entries.iter().map(|e| e.balance).sum();
    BalanceSheet { entries, total }
}
