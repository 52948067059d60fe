// Prospect Allocation Day calculator: prospect contracts, draft slots and the
// installment plus rollover pool they are paid from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::BudgetError;
use crate::league::player::{team_roster, Player, PlayerType};
use crate::league::team::TeamDirectory;
use crate::ledger::player_log::PlayerLogEntry;
use crate::ledger::wizbucks::{Installment, LedgerWriter, RelatedPlayer, Transaction, TransactionType};

pub const MAX_DC_SLOTS: u32 = 15;
pub const MAX_BC_SLOTS: u32 = 2;
pub const DC_SLOT_COST: u32 = 5;
pub const BC_SLOT_COST: u32 = 20;
/// Rollover carried across all installments.
pub const MAX_TOTAL_ROLLOVER: i64 = 75;
/// Rollover usable at PAD.
pub const MAX_PAD_ROLLOVER: u32 = 25;
pub const MAX_KAP_ROLLOVER: u32 = 30;

pub fn draft_key(team: &str, season: i32) -> String {
    format!("pad_draft_{team}_{season}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProspectContract {
    #[serde(rename = "DC")]
    Development,
    #[serde(rename = "PC")]
    Purchased,
    #[serde(rename = "BC")]
    BlueChip,
}

impl ProspectContract {
    pub fn price(&self) -> u32 {
        match self {
            ProspectContract::Development => 5,
            ProspectContract::Purchased => 10,
            ProspectContract::BlueChip => 20,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            ProspectContract::Development => "DC",
            ProspectContract::Purchased => "PC",
            ProspectContract::BlueChip => "BC",
        }
    }

    fn transaction_type(&self) -> TransactionType {
        match self {
            ProspectContract::Development => TransactionType::DcPurchase,
            ProspectContract::Purchased => TransactionType::PcPurchase,
            ProspectContract::BlueChip => TransactionType::BcPurchase,
        }
    }

    /// Contracts `self` may be upgraded to.
    fn upgrades_to(&self, target: ProspectContract) -> bool {
        matches!(
            (self, target),
            (ProspectContract::Development, ProspectContract::Purchased)
                | (ProspectContract::Development, ProspectContract::BlueChip)
                | (ProspectContract::Purchased, ProspectContract::BlueChip)
        )
    }
}

impl fmt::Display for ProspectContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Prior-season finish, which sets the PAD installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadBracket {
    Championship,
    Consolation,
    Elimination,
}

impl PadBracket {
    /// Ranks 1-4 and 5-8 made the playoff brackets. Anything else, including
    /// a missing rank, is elimination.
    pub fn from_rank(rank: Option<u32>) -> Self {
        match rank {
            Some(1..=4) => PadBracket::Championship,
            Some(5..=8) => PadBracket::Consolation,
            _ => PadBracket::Elimination,
        }
    }

    pub fn installment(&self) -> u32 {
        match self {
            PadBracket::Championship => 100,
            PadBracket::Consolation => 120,
            PadBracket::Elimination => 140,
        }
    }
}

/// What happens to a prospect left without a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedOutcome {
    Dropped,
    RetainedTcR,
}

#[derive(Debug, Clone)]
pub struct Prospect {
    pub player: Player,
    /// Signed under the pre-overhaul development contract; all PAD contracts
    /// are free for these.
    pub legacy_dc: bool,
    pub top_100_rank: Option<u32>,
    pub contract: Option<ProspectContract>,
}

impl Prospect {
    fn new(player: &Player, top100: &HashMap<String, u32>) -> Self {
        let top_100_rank = top100.get(&player.upid).copied().or(player.top_100_rank);
        Prospect {
            legacy_dc: player.is_legacy_dc(),
            top_100_rank,
            // Top 100 prospects keep their BC automatically.
            contract: top_100_rank.map(|_| ProspectContract::BlueChip),
            player: player.clone(),
        }
    }

    pub fn is_auto_retained(&self) -> bool {
        self.top_100_rank.is_some()
    }

    pub fn dc_eligible(&self) -> bool {
        !self.player.has_service_time()
    }

    pub fn unassigned_outcome(&self) -> Option<UnassignedOutcome> {
        if self.contract.is_some() {
            return None;
        }
        Some(if self.player.is_rookie() {
            UnassignedOutcome::Dropped
        } else {
            UnassignedOutcome::RetainedTcR
        })
    }
}

/// Saved draft of a PAD in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PadSelection {
    pub contracts: BTreeMap<String, ProspectContract>,
    /// Prospect holding the season's one free BC.
    pub free_bc: Option<String>,
    pub dc_slots: u32,
    pub bc_slots: u32,
    pub applied_rollover: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadSummary {
    pub installment: u32,
    pub applied_rollover: u32,
    pub available: u32,
    pub contracts_cost: u32,
    pub dc_slots_cost: u32,
    pub bc_slots_cost: u32,
    pub total: u32,
    pub remaining: i64,
    pub rollover_to_kap: u32,
}

// ---------------------------------------------------------------------------
// Submission record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedProspect {
    pub upid: String,
    pub name: String,
    pub contract_type: ProspectContract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedProspect {
    pub upid: String,
    pub name: String,
    pub outcome: UnassignedOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PadAllocations {
    pub prospects: Vec<AllocatedProspect>,
    pub dc_slots: u32,
    pub bc_slots: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadSpending {
    pub total: u32,
    pub remaining: i64,
    pub rollover: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadRecord {
    pub team: String,
    pub timestamp: DateTime<Utc>,
    pub allocations: PadAllocations,
    #[serde(default)]
    pub unassigned: Vec<UnassignedProspect>,
    pub spending: PadSpending,
}

#[derive(Debug, Clone)]
pub struct PadSubmission {
    pub record: PadRecord,
    pub transactions: Vec<Transaction>,
    pub player_log: Vec<PlayerLogEntry>,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub struct PadCalculator {
    team: String,
    season: i32,
    bracket: PadBracket,
    rollover_cap: u32,
    prospects: Vec<Prospect>,
    free_bc: Option<String>,
    dc_slots: u32,
    bc_slots: u32,
    applied_rollover: u32,
}

impl PadCalculator {
    /// `balance` is the team's current WizBucks balance, which bounds the
    /// rollover it may bring in. `top100` maps upid to the latest pipeline
    /// rank and overrides the rank stored on the player.
    pub fn new(
        team: &str,
        season: i32,
        final_rank: Option<u32>,
        balance: i64,
        roster: &[Player],
        top100: &HashMap<String, u32>,
    ) -> Self {
        let prospects: Vec<Prospect> = team_roster(roster, team, Some(PlayerType::Farm))
            .into_iter()
            .map(|p| Prospect::new(p, top100))
            .collect();
        let rollover_total = balance.clamp(0, MAX_TOTAL_ROLLOVER) as u32;
        let bracket = PadBracket::from_rank(final_rank);
        debug!(team, prospects = prospects.len(), ?bracket, "PAD roster loaded");
        PadCalculator {
            team: team.to_string(),
            season,
            bracket,
            rollover_cap: rollover_total.min(MAX_PAD_ROLLOVER),
            prospects,
            free_bc: None,
            dc_slots: 0,
            bc_slots: 0,
            applied_rollover: 0,
        }
    }

    pub fn restore(&mut self, saved: PadSelection) {
        for prospect in self.prospects.iter_mut().filter(|p| !p.is_auto_retained()) {
            prospect.contract = saved.contracts.get(&prospect.player.upid).copied();
            if prospect.contract == Some(ProspectContract::Development) && !prospect.dc_eligible() {
                prospect.contract = None;
            }
        }
        let free_bc = saved
            .free_bc
            .filter(|upid| self.free_bc_holders().any(|p| &p.player.upid == upid));
        self.free_bc = free_bc;
        self.settle_free_bc();
        self.dc_slots = saved.dc_slots.min(MAX_DC_SLOTS);
        self.bc_slots = saved.bc_slots.min(MAX_BC_SLOTS);
        self.set_rollover(saved.applied_rollover);
    }

    pub fn selection(&self) -> PadSelection {
        PadSelection {
            contracts: self
                .prospects
                .iter()
                .filter(|p| !p.is_auto_retained())
                .filter_map(|p| p.contract.map(|c| (p.player.upid.clone(), c)))
                .collect(),
            free_bc: self.free_bc.clone(),
            dc_slots: self.dc_slots,
            bc_slots: self.bc_slots,
            applied_rollover: self.applied_rollover,
        }
    }

    pub fn prospects(&self) -> &[Prospect] {
        &self.prospects
    }

    pub fn bracket(&self) -> PadBracket {
        self.bracket
    }

    pub fn rollover_cap(&self) -> u32 {
        self.rollover_cap
    }

    /// Apply up to the PAD rollover cap. Returns the amount actually applied.
    pub fn set_rollover(&mut self, amount: u32) -> u32 {
        self.applied_rollover = amount.min(self.rollover_cap);
        self.applied_rollover
    }

    pub fn available(&self) -> u32 {
        self.bracket.installment() + self.applied_rollover
    }

    pub fn free_bc_used(&self) -> bool {
        self.free_bc.is_some()
    }

    fn find(&self, upid: &str) -> Result<&Prospect, BudgetError> {
        self.prospects
            .iter()
            .find(|p| p.player.upid == upid)
            .ok_or_else(|| BudgetError::UnknownPlayer { upid: upid.to_string() })
    }

    fn index_of(&self, upid: &str) -> Result<usize, BudgetError> {
        self.prospects
            .iter()
            .position(|p| p.player.upid == upid)
            .ok_or_else(|| BudgetError::UnknownPlayer { upid: upid.to_string() })
    }

    /// Price of `contract` for `prospect` given the current free-BC state.
    fn price_for(&self, prospect: &Prospect, contract: ProspectContract) -> u32 {
        if prospect.legacy_dc || prospect.is_auto_retained() {
            return 0;
        }
        if contract == ProspectContract::BlueChip {
            let holds_free = self.free_bc.as_deref() == Some(prospect.player.upid.as_str());
            if holds_free || self.free_bc.is_none() {
                return 0;
            }
        }
        contract.price()
    }

    /// What the prospect's current contract costs.
    fn cost_of(&self, prospect: &Prospect) -> u32 {
        match prospect.contract {
            Some(c) => self.price_for(prospect, c),
            None => 0,
        }
    }

    fn contracts_cost(&self) -> u32 {
        self.prospects.iter().map(|p| self.cost_of(p)).sum()
    }

    fn total_spend(&self) -> u32 {
        self.contracts_cost() + self.dc_slots * DC_SLOT_COST + self.bc_slots * BC_SLOT_COST
    }

    fn require_balance(&self, needed: u32) -> Result<(), BudgetError> {
        let remaining = i64::from(self.available()) - i64::from(self.total_spend());
        if remaining < i64::from(needed) {
            return Err(BudgetError::InsufficientBalance { needed, remaining });
        }
        Ok(())
    }

    /// Prospects whose BC could be the free one.
    fn free_bc_holders(&self) -> impl Iterator<Item = &Prospect> {
        self.prospects.iter().filter(|p| {
            !p.legacy_dc && !p.is_auto_retained() && p.contract == Some(ProspectContract::BlueChip)
        })
    }

    /// The free BC always sits on a BC prospect while one exists.
    fn settle_free_bc(&mut self) {
        if self.free_bc.is_none() {
            let next = self.free_bc_holders().next().map(|p| p.player.upid.clone());
            self.free_bc = next;
        }
    }

    fn claim_free_bc(&mut self, idx: usize, contract: ProspectContract) {
        let p = &self.prospects[idx];
        if contract == ProspectContract::BlueChip
            && self.free_bc.is_none()
            && !p.legacy_dc
            && !p.is_auto_retained()
        {
            self.free_bc = Some(p.player.upid.clone());
        }
    }

    /// Give an unassigned prospect a contract. Returns the price charged.
    pub fn assign(&mut self, upid: &str, contract: ProspectContract) -> Result<u32, BudgetError> {
        let idx = self.index_of(upid)?;
        let prospect = &self.prospects[idx];
        if prospect.is_auto_retained() || prospect.contract.is_some() {
            return Err(BudgetError::NotEligible {
                upid: upid.to_string(),
                reason: "prospect already has a contract".to_string(),
            });
        }
        if contract == ProspectContract::Development && !prospect.dc_eligible() {
            return Err(BudgetError::NotEligible {
                upid: upid.to_string(),
                reason: "has MLB service time, DC ineligible".to_string(),
            });
        }
        let cost = self.price_for(prospect, contract);
        self.require_balance(cost)?;
        self.claim_free_bc(idx, contract);
        self.prospects[idx].contract = Some(contract);
        Ok(cost)
    }

    /// Move a prospect up to a better contract, paying the price difference.
    /// Returns the extra amount charged.
    pub fn upgrade(&mut self, upid: &str, target: ProspectContract) -> Result<u32, BudgetError> {
        let idx = self.index_of(upid)?;
        let prospect = &self.prospects[idx];
        let current = match prospect.contract {
            Some(c) if !prospect.is_auto_retained() && c.upgrades_to(target) => c,
            _ => {
                return Err(BudgetError::NotEligible {
                    upid: upid.to_string(),
                    reason: format!("cannot upgrade to {target}"),
                })
            }
        };
        let cost = self
            .price_for(prospect, target)
            .saturating_sub(self.price_for(prospect, current));
        self.require_balance(cost)?;
        self.claim_free_bc(idx, target);
        self.prospects[idx].contract = Some(target);
        Ok(cost)
    }

    /// Clear a prospect's contract. Releasing the free BC passes it to another
    /// BC prospect, or makes it available again.
    pub fn remove(&mut self, upid: &str) -> Result<(), BudgetError> {
        let idx = self.index_of(upid)?;
        if self.prospects[idx].is_auto_retained() {
            return Err(BudgetError::NotEligible {
                upid: upid.to_string(),
                reason: "Top 100 prospects are retained automatically".to_string(),
            });
        }
        self.prospects[idx].contract = None;
        if self.free_bc.as_deref() == Some(upid) {
            self.free_bc = None;
            self.settle_free_bc();
        }
        Ok(())
    }

    pub fn add_dc_slot(&mut self) -> Result<u32, BudgetError> {
        if self.dc_slots >= MAX_DC_SLOTS {
            return Err(BudgetError::SlotLimit { kind: "DC", max: MAX_DC_SLOTS });
        }
        self.require_balance(DC_SLOT_COST)?;
        self.dc_slots += 1;
        Ok(self.dc_slots)
    }

    pub fn remove_dc_slot(&mut self) -> u32 {
        self.dc_slots = self.dc_slots.saturating_sub(1);
        self.dc_slots
    }

    pub fn add_bc_slot(&mut self) -> Result<u32, BudgetError> {
        if self.bc_slots >= MAX_BC_SLOTS {
            return Err(BudgetError::SlotLimit { kind: "BC", max: MAX_BC_SLOTS });
        }
        self.require_balance(BC_SLOT_COST)?;
        self.bc_slots += 1;
        Ok(self.bc_slots)
    }

    pub fn remove_bc_slot(&mut self) -> u32 {
        self.bc_slots = self.bc_slots.saturating_sub(1);
        self.bc_slots
    }

    pub fn summary(&self) -> PadSummary {
        let contracts_cost = self.contracts_cost();
        let dc_slots_cost = self.dc_slots * DC_SLOT_COST;
        let bc_slots_cost = self.bc_slots * BC_SLOT_COST;
        let total = contracts_cost + dc_slots_cost + bc_slots_cost;
        let available = self.available();
        let remaining = i64::from(available) - i64::from(total);
        PadSummary {
            installment: self.bracket.installment(),
            applied_rollover: self.applied_rollover,
            available,
            contracts_cost,
            dc_slots_cost,
            bc_slots_cost,
            total,
            remaining,
            rollover_to_kap: remaining.clamp(0, i64::from(MAX_KAP_ROLLOVER)) as u32,
        }
    }

    pub fn validate(&self) -> Vec<BudgetError> {
        let s = self.summary();
        let mut problems = Vec::new();
        if s.total > s.available {
            problems.push(BudgetError::OverBudget {
                total: s.total,
                available: s.available,
            });
        }
        problems
    }

    pub fn submit(&self, now: DateTime<Utc>) -> Result<PadSubmission, BudgetError> {
        if let Some(problem) = self.validate().into_iter().next() {
            return Err(problem);
        }
        let summary = self.summary();
        let mut ledger = LedgerWriter::new(
            &self.team,
            Installment::Pad,
            self.season,
            i64::from(summary.available),
            now,
        );
        let mut log = Vec::new();

        for prospect in self.prospects.iter().filter(|p| !p.is_auto_retained()) {
            let Some(contract) = prospect.contract else {
                continue;
            };
            let p = &prospect.player;
            let cost = self.cost_of(prospect);
            let txn_id = (cost > 0).then(|| {
                ledger.charge(
                    contract.transaction_type(),
                    cost,
                    format!("{contract} contract assigned to {}", p.name),
                    Some(RelatedPlayer {
                        upid: p.upid.clone(),
                        name: p.name.clone(),
                    }),
                )
            });
            log.push(PlayerLogEntry::new(
                p,
                &self.team,
                self.season,
                "contract_assigned",
                json!({
                    "contract_type": { "from": null, "to": contract.display_str() },
                    "manager": { "from": null, "to": self.team },
                    "player_type": { "from": null, "to": "Farm" },
                }),
                format!("Assigned {contract} contract"),
                txn_id,
                now,
            ));
        }

        for prospect in self.prospects.iter() {
            let Some(rank) = prospect.top_100_rank else {
                continue;
            };
            log.push(PlayerLogEntry::new(
                &prospect.player,
                &self.team,
                self.season,
                "bc_retention",
                json!({ "contract_type": { "from": "BC", "to": "BC" } }),
                format!("BC auto-retained (Top 100 #{rank})"),
                None,
                now,
            ));
        }

        for slot in 1..=self.dc_slots {
            ledger.charge(
                TransactionType::DcSlotPurchase,
                DC_SLOT_COST,
                format!("DC draft slot #{slot}"),
                None,
            );
        }
        for slot in 1..=self.bc_slots {
            ledger.charge(
                TransactionType::BcSlotPurchase,
                BC_SLOT_COST,
                format!("BC draft slot #{slot}"),
                None,
            );
        }
        if summary.rollover_to_kap > 0 {
            ledger.charge(
                TransactionType::RolloverToKap,
                summary.rollover_to_kap,
                format!("Rollover ${} from PAD to KAP", summary.rollover_to_kap),
                None,
            );
        }

        let record = PadRecord {
            team: self.team.clone(),
            timestamp: now,
            allocations: PadAllocations {
                prospects: self
                    .prospects
                    .iter()
                    .filter_map(|p| {
                        p.contract.map(|c| AllocatedProspect {
                            upid: p.player.upid.clone(),
                            name: p.player.name.clone(),
                            contract_type: c,
                        })
                    })
                    .collect(),
                dc_slots: self.dc_slots,
                bc_slots: self.bc_slots,
            },
            unassigned: self
                .prospects
                .iter()
                .filter_map(|p| {
                    p.unassigned_outcome().map(|outcome| UnassignedProspect {
                        upid: p.player.upid.clone(),
                        name: p.player.name.clone(),
                        outcome,
                    })
                })
                .collect(),
            spending: PadSpending {
                total: summary.total,
                remaining: summary.remaining,
                rollover: summary.rollover_to_kap,
            },
        };
        info!(
            team = %self.team,
            contracts = record.allocations.prospects.len(),
            total = summary.total,
            "PAD submission built"
        );
        Ok(PadSubmission {
            record,
            transactions: ledger.finish(),
            player_log: log,
        })
    }
}

/// KAP rollover per team from stored PAD submissions, clamped to
/// `[0, MAX_KAP_ROLLOVER]`. Submissions for unknown teams are skipped.
pub fn kap_rollover_from_pad(
    submissions: &BTreeMap<String, Value>,
    teams: &TeamDirectory,
) -> BTreeMap<String, u32> {
    let mut out = BTreeMap::new();
    for abbr in teams.abbreviations() {
        let Some(submission) = submissions.get(&abbr) else {
            continue;
        };
        let raw = &submission["spending"]["rollover"];
        let value = raw
            .as_f64()
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
            .unwrap_or_else(|| {
                warn!(team = %abbr, "PAD submission has no usable rollover");
                0.0
            });
        let clamped = value.clamp(0.0, f64::from(MAX_KAP_ROLLOVER)).floor() as u32;
        out.insert(abbr, clamped);
    }
    out
}
