// Keeper Assignment Period calculator: keeper selection, IL tags,
// Reduce-a-Tier and draft buy-ins against the KAP allotment.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::tax::{bracket_for, TaxBracket, MAX_TAXABLE_SPEND};
use super::BudgetError;
use crate::draft::picks::{buy_in_cost, BUY_IN_COSTS};
use crate::league::contract::{ContractCode, Tier};
use crate::league::player::{team_roster, Player, PlayerType};
use crate::ledger::player_log::PlayerLogEntry;
use crate::ledger::wizbucks::{Installment, LedgerWriter, RelatedPlayer, Transaction, TransactionType};

pub const KEEPER_LIMIT: usize = 26;
/// Reduce-a-Tier fee. Tax-free.
pub const RAT_COST: u32 = 75;
pub const MAX_APA_ROLLOVER: i64 = 100;
/// Contract assumed for MLB players exported without one.
const DEFAULT_CONTRACT: &str = "TC-1";

pub fn draft_key(team: &str, season: i32) -> String {
    format!("kap_draft_{team}_{season}")
}

/// An MLB player eligible to be kept, with its parsed contract.
#[derive(Debug, Clone)]
pub struct KapPlayer {
    pub player: Player,
    pub contract: String,
    pub code: Option<ContractCode>,
}

impl KapPlayer {
    fn from_player(player: &Player) -> Self {
        let contract = player
            .contract_type
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTRACT.to_string());
        KapPlayer {
            code: ContractCode::parse(&contract),
            contract,
            player: player.clone(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.code
            .map(|c| c.tier())
            .unwrap_or_else(|| Tier::of_contract(&self.contract))
    }

    /// Salary after an optional IL discount. Unknown contracts cost nothing.
    pub fn salary(&self, il_tagged: bool) -> u32 {
        self.code.map(|c| c.effective_salary(il_tagged)).unwrap_or(0)
    }
}

/// Editable selection state. This is what gets saved as a draft between
/// sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KapSelection {
    pub keepers: Vec<String>,
    /// At most one tagged keeper per tier.
    pub il_tags: HashMap<Tier, String>,
    pub reduced: Vec<String>,
    pub buy_ins: BTreeSet<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KapSummary {
    pub keeper_count: usize,
    pub keeper_salary: u32,
    pub buy_in_total: u32,
    pub taxable: u32,
    pub tax_free: u32,
    pub total: u32,
    pub available: u32,
    pub remaining: i64,
    pub rollover_to_apa: u32,
    pub bracket: TaxBracket,
}

// ---------------------------------------------------------------------------
// Submission record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptPlayer {
    pub upid: String,
    pub name: String,
    pub contract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KapSpending {
    pub taxable: u32,
    pub tax_free: u32,
    pub total: u32,
    pub rollover: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KapRecord {
    pub team: String,
    pub timestamp: DateTime<Utc>,
    pub keepers: Vec<KeptPlayer>,
    pub spending: KapSpending,
    pub tax_bracket: Vec<u32>,
}

/// Everything a confirmed KAP produces.
#[derive(Debug, Clone)]
pub struct KapSubmission {
    pub record: KapRecord,
    pub transactions: Vec<Transaction>,
    pub player_log: Vec<PlayerLogEntry>,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub struct KapCalculator {
    team: String,
    season: i32,
    allotment: u32,
    pad_rollover: u32,
    players: Vec<KapPlayer>,
    selection: KapSelection,
}

impl KapCalculator {
    /// `roster` may be the whole league; only the team's MLB players are kept.
    pub fn new(team: &str, season: i32, allotment: u32, pad_rollover: u32, roster: &[Player]) -> Self {
        let players: Vec<KapPlayer> = team_roster(roster, team, Some(PlayerType::Mlb))
            .into_iter()
            .map(KapPlayer::from_player)
            .collect();
        debug!(team, count = players.len(), "KAP roster loaded");
        KapCalculator {
            team: team.to_string(),
            season,
            allotment,
            pad_rollover,
            players,
            selection: KapSelection::default(),
        }
    }

    /// Restore a saved selection, ignoring players no longer on the roster.
    /// IL tags, Reduce-a-Tier and buy-ins go back through the same checks as
    /// interactive edits; whatever fails them is dropped.
    pub fn restore(&mut self, saved: KapSelection) {
        let mut keepers: Vec<String> = Vec::new();
        for upid in saved.keepers {
            if self.find(&upid).is_ok() && !keepers.contains(&upid) && keepers.len() < KEEPER_LIMIT {
                keepers.push(upid);
            }
        }
        self.selection = KapSelection {
            keepers,
            ..KapSelection::default()
        };

        let mut tags: Vec<(Tier, String)> = saved.il_tags.into_iter().collect();
        tags.sort();
        for (tier, upid) in tags {
            if !self.find(&upid).is_ok_and(|p| p.tier() == tier) {
                debug!(team = %self.team, upid = %upid, "Dropping IL tag saved under the {} tier", tier);
                continue;
            }
            if let Err(e) = self.apply_il_tag(&upid) {
                debug!(team = %self.team, "Dropping saved IL tag: {}", e);
            }
        }
        for upid in saved.reduced {
            if self.is_reduced(&upid) {
                continue;
            }
            if let Err(e) = self.toggle_reduce_tier(&upid) {
                debug!(team = %self.team, "Dropping saved Reduce-a-Tier: {}", e);
            }
        }
        for round in saved.buy_ins {
            if let Err(e) = self.toggle_buy_in(round) {
                debug!(team = %self.team, "Dropping saved buy-in: {}", e);
            }
        }
    }

    pub fn selection(&self) -> &KapSelection {
        &self.selection
    }

    pub fn players(&self) -> &[KapPlayer] {
        &self.players
    }

    pub fn available(&self) -> u32 {
        self.allotment + self.pad_rollover
    }

    fn find(&self, upid: &str) -> Result<&KapPlayer, BudgetError> {
        self.players
            .iter()
            .find(|p| p.player.upid == upid)
            .ok_or_else(|| BudgetError::UnknownPlayer { upid: upid.to_string() })
    }

    pub fn is_keeper(&self, upid: &str) -> bool {
        self.selection.keepers.iter().any(|k| k == upid)
    }

    pub fn is_il_tagged(&self, upid: &str) -> bool {
        self.selection.il_tags.values().any(|u| u == upid)
    }

    pub fn is_reduced(&self, upid: &str) -> bool {
        self.selection.reduced.iter().any(|u| u == upid)
    }

    fn remaining(&self) -> i64 {
        i64::from(self.available()) - i64::from(self.total_spend())
    }

    fn require_balance(&self, needed: u32) -> Result<(), BudgetError> {
        let remaining = self.remaining();
        if remaining < i64::from(needed) {
            return Err(BudgetError::InsufficientBalance { needed, remaining });
        }
        Ok(())
    }

    /// Select or deselect a keeper. Returns whether the player is now kept.
    /// Deselecting also drops the player's IL tag and Reduce-a-Tier.
    pub fn toggle_keeper(&mut self, upid: &str) -> Result<bool, BudgetError> {
        self.find(upid)?;
        if self.is_keeper(upid) {
            self.selection.keepers.retain(|k| k != upid);
            self.selection.il_tags.retain(|_, u| u != upid);
            self.selection.reduced.retain(|u| u != upid);
            return Ok(false);
        }
        if self.selection.keepers.len() >= KEEPER_LIMIT {
            return Err(BudgetError::TooManyKeepers {
                count: self.selection.keepers.len() + 1,
                max: KEEPER_LIMIT,
            });
        }
        self.selection.keepers.push(upid.to_string());
        Ok(true)
    }

    /// Keepers that could take the IL tag for `tier`.
    pub fn il_candidates(&self, tier: Tier) -> Vec<&KapPlayer> {
        self.players
            .iter()
            .filter(|p| self.is_keeper(&p.player.upid))
            .filter(|p| p.code.is_some_and(|c| c.il_eligible()))
            .filter(|p| p.tier() == tier)
            .filter(|p| !self.is_il_tagged(&p.player.upid))
            .collect()
    }

    pub fn apply_il_tag(&mut self, upid: &str) -> Result<(), BudgetError> {
        let player = self.find(upid)?;
        if !self.is_keeper(upid) {
            return Err(BudgetError::NotAKeeper { upid: upid.to_string() });
        }
        let Some(code) = player.code.filter(|c| c.il_eligible()) else {
            return Err(BudgetError::NotEligible {
                upid: upid.to_string(),
                reason: format!("{} contracts cannot be IL tagged", player.contract),
            });
        };
        let tier = code.tier();
        if self.selection.il_tags.contains_key(&tier) {
            return Err(BudgetError::IlTagTaken { tier });
        }
        self.selection.il_tags.insert(tier, upid.to_string());
        Ok(())
    }

    pub fn remove_il_tag(&mut self, tier: Tier) -> Option<String> {
        self.selection.il_tags.remove(&tier)
    }

    /// Keepers whose contract can be reduced a tier.
    pub fn rat_candidates(&self) -> Vec<&KapPlayer> {
        self.players
            .iter()
            .filter(|p| self.is_keeper(&p.player.upid))
            .filter(|p| p.code.and_then(|c| c.reduce_tier()).is_some())
            .collect()
    }

    /// Apply or remove Reduce-a-Tier. Returns whether it is now applied.
    pub fn toggle_reduce_tier(&mut self, upid: &str) -> Result<bool, BudgetError> {
        let player = self.find(upid)?;
        if self.is_reduced(upid) {
            self.selection.reduced.retain(|u| u != upid);
            return Ok(false);
        }
        if !self.is_keeper(upid) {
            return Err(BudgetError::NotAKeeper { upid: upid.to_string() });
        }
        if player.code.and_then(|c| c.reduce_tier()).is_none() {
            return Err(BudgetError::NotEligible {
                upid: upid.to_string(),
                reason: format!("{} cannot be reduced", player.contract),
            });
        }
        self.require_balance(RAT_COST)?;
        self.selection.reduced.push(upid.to_string());
        Ok(true)
    }

    /// Purchase or release a draft-round buy-in. Returns whether it is now
    /// purchased.
    pub fn toggle_buy_in(&mut self, round: u32) -> Result<bool, BudgetError> {
        let cost = buy_in_cost(round).ok_or(BudgetError::InvalidRound { round })?;
        if self.selection.buy_ins.remove(&round) {
            return Ok(false);
        }
        self.require_balance(cost)?;
        self.selection.buy_ins.insert(round);
        Ok(true)
    }

    fn keepers(&self) -> impl Iterator<Item = &KapPlayer> {
        self.selection
            .keepers
            .iter()
            .filter_map(|upid| self.players.iter().find(|p| &p.player.upid == upid))
    }

    fn keeper_salary(&self) -> u32 {
        self.keepers()
            .map(|p| p.salary(self.is_il_tagged(&p.player.upid)))
            .sum()
    }

    fn buy_in_total(&self) -> u32 {
        self.selection.buy_ins.iter().filter_map(|r| buy_in_cost(*r)).sum()
    }

    fn tax_free(&self) -> u32 {
        RAT_COST * self.selection.reduced.len() as u32
    }

    fn total_spend(&self) -> u32 {
        self.keeper_salary() + self.buy_in_total() + self.tax_free()
    }

    pub fn summary(&self) -> KapSummary {
        let keeper_salary = self.keeper_salary();
        let buy_in_total = self.buy_in_total();
        let taxable = keeper_salary + buy_in_total;
        let tax_free = self.tax_free();
        let total = taxable + tax_free;
        let remaining = i64::from(self.available()) - i64::from(total);
        KapSummary {
            keeper_count: self.selection.keepers.len(),
            keeper_salary,
            buy_in_total,
            taxable,
            tax_free,
            total,
            available: self.available(),
            remaining,
            rollover_to_apa: remaining.clamp(0, MAX_APA_ROLLOVER) as u32,
            bracket: bracket_for(taxable),
        }
    }

    /// Every rule the current selection breaks. Empty means submittable.
    pub fn validate(&self) -> Vec<BudgetError> {
        let summary = self.summary();
        let mut problems = Vec::new();
        if summary.keeper_count > KEEPER_LIMIT {
            problems.push(BudgetError::TooManyKeepers {
                count: summary.keeper_count,
                max: KEEPER_LIMIT,
            });
        }
        if summary.taxable > MAX_TAXABLE_SPEND {
            problems.push(BudgetError::TaxableOverLimit {
                spend: summary.taxable,
                max: MAX_TAXABLE_SPEND,
            });
        }
        if summary.total > summary.available {
            problems.push(BudgetError::OverBudget {
                total: summary.total,
                available: summary.available,
            });
        }
        problems
    }

    /// Build the submission record, ledger lines and player log for the
    /// current selection.
    pub fn submit(&self, now: DateTime<Utc>) -> Result<KapSubmission, BudgetError> {
        if let Some(problem) = self.validate().into_iter().next() {
            return Err(problem);
        }
        let summary = self.summary();
        let mut ledger = LedgerWriter::new(
            &self.team,
            Installment::Kap,
            self.season,
            i64::from(summary.available),
            now,
        );
        let mut log = Vec::new();

        for keeper in self.keepers() {
            let p = &keeper.player;
            let tagged = self.is_il_tagged(&p.upid);
            let (kind, suffix) = if tagged {
                (TransactionType::KeeperSalaryIl, " (IL)")
            } else {
                (TransactionType::KeeperSalary, "")
            };
            let txn_id = ledger.charge(
                kind,
                keeper.salary(tagged),
                format!("Keeper salary: {} - {}{suffix}", p.name, keeper.contract),
                Some(related(p)),
            );
            let advanced = keeper.code.map(|c| c.advance().display_str());
            log.push(PlayerLogEntry::new(
                p,
                &self.team,
                self.season,
                "keeper_selected",
                json!({
                    "status": { "from": "Rostered", "to": "Keeper" },
                    "contract": { "from": keeper.contract, "to": advanced },
                }),
                format!(
                    "Selected as keeper - {}{}",
                    keeper.contract,
                    if tagged { " with IL Tag" } else { "" }
                ),
                Some(txn_id),
                now,
            ));
        }

        for upid in &self.selection.reduced {
            let keeper = self.find(upid)?;
            let p = &keeper.player;
            let Some(to) = keeper.code.and_then(|c| c.reduce_tier()) else {
                continue;
            };
            let txn_id = ledger.charge(
                TransactionType::ReduceTier,
                RAT_COST,
                format!("Reduce-a-Tier: {} ({} → {to})", p.name, keeper.contract),
                Some(related(p)),
            );
            log.push(PlayerLogEntry::new(
                p,
                &self.team,
                self.season,
                "tier_reduced",
                json!({ "effective_contract": { "from": keeper.contract, "to": to.display_str() } }),
                format!("Tier reduced via RaT ({} → {to})", keeper.contract),
                Some(txn_id),
                now,
            ));
        }

        for &(round, cost) in BUY_IN_COSTS.iter() {
            if self.selection.buy_ins.contains(&round) {
                ledger.charge(TransactionType::RoundBuyin, cost, format!("Round {round} buy-in"), None);
            }
        }

        if summary.rollover_to_apa > 0 {
            ledger.charge(
                TransactionType::RolloverToApa,
                summary.rollover_to_apa,
                format!("Rollover ${} from KAP to APA", summary.rollover_to_apa),
                None,
            );
        }

        let record = KapRecord {
            team: self.team.clone(),
            timestamp: now,
            keepers: self
                .keepers()
                .map(|k| KeptPlayer {
                    upid: k.player.upid.clone(),
                    name: k.player.name.clone(),
                    contract: k.contract.clone(),
                })
                .collect(),
            spending: KapSpending {
                taxable: summary.taxable,
                tax_free: summary.tax_free,
                total: summary.total,
                rollover: summary.rollover_to_apa,
            },
            tax_bracket: summary.bracket.lost_rounds.to_vec(),
        };
        info!(
            team = %self.team,
            keepers = record.keepers.len(),
            total = summary.total,
            "KAP submission built"
        );
        Ok(KapSubmission {
            record,
            transactions: ledger.finish(),
            player_log: log,
        })
    }
}

fn related(p: &Player) -> RelatedPlayer {
    RelatedPlayer {
        upid: p.upid.clone(),
        name: p.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::player::tests::player;
    use chrono::TimeZone;

    fn roster() -> Vec<Player> {
        vec![
            player("1", "Franchise Guy", "WIZ", PlayerType::Mlb, "FC-1"),
            player("2", "Vested Guy", "WIZ", PlayerType::Mlb, "VC-2"),
            player("3", "Rookie", "WIZ", PlayerType::Mlb, "TC-R"),
            player("4", "Tender", "WIZ", PlayerType::Mlb, "TC-1"),
            player("5", "Farmhand", "WIZ", PlayerType::Farm, "PC"),
            player("6", "Elsewhere", "HAM", PlayerType::Mlb, "FC-2"),
        ]
    }

    fn calc() -> KapCalculator {
        KapCalculator::new("WIZ", 2026, 375, 30, &roster())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn only_team_mlb_players_are_candidates() {
        let c = calc();
        assert_eq!(c.players().len(), 4);
        assert_eq!(c.available(), 405);
        assert!(matches!(
            calc().toggle_keeper("6"),
            Err(BudgetError::UnknownPlayer { .. })
        ));
    }

    #[test]
    fn zero_keepers_cost_nothing() {
        let s = calc().summary();
        assert_eq!(s.keeper_salary, 0);
        assert_eq!(s.total, 0);
        assert_eq!(s.remaining, 405);
        assert_eq!(s.rollover_to_apa, 100);
        assert!(!s.bracket.is_taxed());
    }

    #[test]
    fn keeper_limit_enforced() {
        let roster: Vec<Player> = (0..30)
            .map(|i| player(&i.to_string(), "P", "WIZ", PlayerType::Mlb, "TC-R"))
            .collect();
        let mut c = KapCalculator::new("WIZ", 2026, 375, 0, &roster);
        for i in 0..KEEPER_LIMIT {
            assert!(c.toggle_keeper(&i.to_string()).unwrap());
        }
        let err = c.toggle_keeper("26").unwrap_err();
        assert_eq!(err, BudgetError::TooManyKeepers { count: 27, max: 26 });
        assert_eq!(c.summary().keeper_count, 26);
    }

    #[test]
    fn restore_never_exceeds_keeper_limit() {
        let roster: Vec<Player> = (0..30)
            .map(|i| player(&i.to_string(), "P", "WIZ", PlayerType::Mlb, "TC-R"))
            .collect();
        let mut c = KapCalculator::new("WIZ", 2026, 375, 0, &roster);
        c.restore(KapSelection {
            keepers: (0..30).map(|i| i.to_string()).collect(),
            ..Default::default()
        });
        assert_eq!(c.selection().keepers.len(), KEEPER_LIMIT);
        assert!(c.validate().is_empty());
    }

    #[test]
    fn restore_drops_ineligible_il_tags() {
        let mut c = calc();
        c.restore(KapSelection {
            keepers: vec!["1".into(), "3".into(), "4".into()],
            il_tags: HashMap::from([
                (Tier::Tender, "3".to_string()),
                (Tier::Vested, "4".to_string()),
                (Tier::Franchise, "1".to_string()),
            ]),
            ..Default::default()
        });
        assert_eq!(c.selection().il_tags, HashMap::from([(Tier::Franchise, "1".to_string())]));
        assert!(!c.is_il_tagged("3"));
        assert_eq!(c.summary().keeper_salary, 50 + 5 + 15);
    }

    #[test]
    fn restore_respects_the_balance() {
        let mut c = KapCalculator::new("WIZ", 2026, 100, 0, &roster());
        c.restore(KapSelection {
            keepers: vec!["1".into()],
            reduced: vec!["1".into(), "3".into()],
            buy_ins: BTreeSet::from([1, 3]),
            ..Default::default()
        });
        assert!(c.selection().reduced.is_empty());
        assert_eq!(c.selection().buy_ins, BTreeSet::from([3]));
        assert_eq!(c.summary().remaining, 5);
        assert!(c.validate().is_empty());
    }

    #[test]
    fn il_tag_rules() {
        let mut c = calc();
        assert!(matches!(c.apply_il_tag("1"), Err(BudgetError::NotAKeeper { .. })));
        c.toggle_keeper("1").unwrap();
        c.toggle_keeper("3").unwrap();
        assert!(matches!(c.apply_il_tag("3"), Err(BudgetError::NotEligible { .. })));
        c.apply_il_tag("1").unwrap();
        assert_eq!(c.summary().keeper_salary, 50 + 5);
        assert!(c.il_candidates(Tier::Franchise).is_empty());

        // Deselecting clears the tag.
        c.toggle_keeper("1").unwrap();
        assert!(c.selection().il_tags.is_empty());
    }

    #[test]
    fn one_il_tag_per_tier() {
        let roster = vec![
            player("1", "A", "WIZ", PlayerType::Mlb, "FC-1"),
            player("2", "B", "WIZ", PlayerType::Mlb, "FC-2"),
        ];
        let mut c = KapCalculator::new("WIZ", 2026, 375, 0, &roster);
        c.toggle_keeper("1").unwrap();
        c.toggle_keeper("2").unwrap();
        c.apply_il_tag("1").unwrap();
        assert_eq!(
            c.apply_il_tag("2").unwrap_err(),
            BudgetError::IlTagTaken { tier: Tier::Franchise }
        );
        assert_eq!(c.remove_il_tag(Tier::Franchise), Some("1".to_string()));
        c.apply_il_tag("2").unwrap();
    }

    #[test]
    fn reduce_tier_is_tax_free() {
        let mut c = calc();
        c.toggle_keeper("1").unwrap();
        c.toggle_keeper("4").unwrap();
        assert!(matches!(c.toggle_reduce_tier("4"), Err(BudgetError::NotEligible { .. })));
        assert!(c.toggle_reduce_tier("1").unwrap());
        let s = c.summary();
        assert_eq!(s.taxable, 85 + 15);
        assert_eq!(s.tax_free, 75);
        assert_eq!(s.total, 175);
        assert_eq!(s.remaining, 230);
        assert_eq!(s.rollover_to_apa, 100);
        assert!(!c.toggle_reduce_tier("1").unwrap());
    }

    #[test]
    fn buy_ins_need_balance() {
        let mut c = KapCalculator::new("WIZ", 2026, 60, 0, &roster());
        assert!(c.toggle_buy_in(1).unwrap());
        assert_eq!(
            c.toggle_buy_in(2).unwrap_err(),
            BudgetError::InsufficientBalance { needed: 35, remaining: 5 }
        );
        assert!(matches!(c.toggle_buy_in(4), Err(BudgetError::InvalidRound { round: 4 })));
        assert!(!c.toggle_buy_in(1).unwrap());
        assert_eq!(c.summary().buy_in_total, 0);
    }

    #[test]
    fn validation_reports_over_budget() {
        let roster: Vec<Player> = (0..5)
            .map(|i| player(&i.to_string(), "P", "WIZ", PlayerType::Mlb, "FC-2"))
            .collect();
        let mut c = KapCalculator::new("WIZ", 2026, 375, 30, &roster);
        for i in 0..5 {
            c.toggle_keeper(&i.to_string()).unwrap();
        }
        let problems = c.validate();
        assert!(problems.contains(&BudgetError::TaxableOverLimit { spend: 625, max: 435 }));
        assert!(problems.contains(&BudgetError::OverBudget { total: 625, available: 405 }));
        assert!(c.submit(now()).is_err());
    }

    #[test]
    fn submission_orders_ledger_and_logs() {
        let mut c = calc();
        c.toggle_keeper("1").unwrap();
        c.toggle_keeper("2").unwrap();
        c.apply_il_tag("2").unwrap();
        c.toggle_reduce_tier("1").unwrap();
        c.toggle_buy_in(2).unwrap();

        let sub = c.submit(now()).unwrap();
        let kinds: Vec<TransactionType> =
            sub.transactions.iter().map(|t| t.transaction_type).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::KeeperSalary,
                TransactionType::KeeperSalaryIl,
                TransactionType::ReduceTier,
                TransactionType::RoundBuyin,
                TransactionType::RolloverToApa,
            ]
        );
        // 85 + (55 - 15) + 75 + 35 = 235 of 405, leaving 170 so 100 rolls over.
        assert_eq!(sub.transactions[0].balance_before, 405);
        assert_eq!(sub.transactions[3].balance_after, 170);
        assert_eq!(sub.transactions[4].amount, -100);
        assert_eq!(sub.transactions[4].balance_after, 70);

        assert_eq!(sub.record.spending.taxable, 160);
        assert_eq!(sub.record.spending.tax_free, 75);
        assert_eq!(sub.record.spending.rollover, 100);
        assert!(sub.record.tax_bracket.is_empty());

        assert_eq!(sub.player_log.len(), 3);
        assert_eq!(sub.player_log[0].update_type, "keeper_selected");
        assert_eq!(sub.player_log[0].changes["contract"]["to"], "FC-2");
        assert_eq!(sub.player_log[1].event, "Selected as keeper - VC-2 with IL Tag");
        assert_eq!(sub.player_log[2].update_type, "tier_reduced");
        assert_eq!(
            sub.player_log[2].related_transactions.wizbucks_txn_id.as_deref(),
            Some(sub.transactions[2].txn_id.as_str())
        );

        let json = serde_json::to_value(&sub.record).unwrap();
        assert_eq!(json["spending"]["taxFree"], 75);
        assert!(json["taxBracket"].is_array());
    }

    #[test]
    fn saved_selection_round_trips_through_json() {
        let mut c = calc();
        c.toggle_keeper("1").unwrap();
        c.apply_il_tag("1").unwrap();
        c.toggle_buy_in(3).unwrap();
        let saved = serde_json::to_value(c.selection()).unwrap();

        let mut fresh = calc();
        fresh.restore(serde_json::from_value(saved).unwrap());
        assert_eq!(fresh.summary(), c.summary());
    }
}
