// Draft pick ownership (draft_picks.json), straight-order generation and
// buy-in rounds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::{self, DataSource, DRAFT_ORDER_FILE, DRAFT_PICKS_FILE};

pub const TOTAL_ROUNDS: u32 = 26;

/// Rounds a team must buy into before picking, with their WizBucks cost.
pub const BUY_IN_COSTS: [(u32, u32); 3] = [(1, 55), (2, 35), (3, 10)];

/// Order used when draft_order.json is unavailable.
pub const DEFAULT_ORDER: [&str; 12] = [
    "HAM", "RV", "B2J", "CFL", "LAW", "LFB", "JEP", "TBB", "WIZ", "DRO", "SAD", "WAR",
];

pub fn buy_in_cost(round: u32) -> Option<u32> {
    BUY_IN_COSTS
        .iter()
        .find(|(r, _)| *r == round)
        .map(|(_, cost)| *cost)
}

pub fn is_buy_in_round(round: u32) -> bool {
    buy_in_cost(round).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPick {
    pub round: u32,
    /// Overall pick number, starting at 1.
    pub pick: u32,
    pub original_owner: String,
    pub current_owner: String,
    #[serde(default)]
    pub traded: bool,
}

impl DraftPick {
    /// Ownership changed hands, whatever the `traded` flag says.
    pub fn is_traded(&self) -> bool {
        self.traded || self.current_owner != self.original_owner
    }
}

/// Same order every round (not snake). Overall numbers run 1..=N×R.
pub fn generate_straight(order: &[String], rounds: u32) -> Vec<DraftPick> {
    let mut picks = Vec::with_capacity(order.len() * rounds as usize);
    let mut number = 1;
    for round in 1..=rounds {
        for team in order {
            picks.push(DraftPick {
                round,
                pick: number,
                original_owner: team.clone(),
                current_owner: team.clone(),
                traded: false,
            });
            number += 1;
        }
    }
    picks
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DraftOrderFile {
    #[serde(default)]
    order: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DraftPicksFile {
    #[serde(default)]
    picks: Vec<DraftPick>,
    #[serde(default)]
    buyins: HashMap<String, Vec<u32>>,
}

/// Every pick in the draft plus the buy-ins each team has completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftBoard {
    pub order: Vec<String>,
    pub picks: Vec<DraftPick>,
    pub buyins: HashMap<String, Vec<u32>>,
}

impl DraftBoard {
    /// Board with every team holding its own picks and no buy-ins.
    pub fn straight(order: Vec<String>) -> Self {
        let picks = generate_straight(&order, TOTAL_ROUNDS);
        DraftBoard {
            order,
            picks,
            buyins: HashMap::new(),
        }
    }

    /// draft_order.json then draft_picks.json. A missing order falls back to
    /// the default; missing picks are generated from the order.
    pub async fn load(source: &dyn DataSource) -> Self {
        let order = match data::load::<DraftOrderFile>(source, DRAFT_ORDER_FILE).await {
            Ok(f) if !f.order.is_empty() => f.order,
            Ok(_) => default_order(),
            Err(e) => {
                warn!("No usable {}, using fallback order: {}", DRAFT_ORDER_FILE, e);
                default_order()
            }
        };

        match data::load::<DraftPicksFile>(source, DRAFT_PICKS_FILE).await {
            Ok(file) => {
                info!("Loaded {} draft picks", file.picks.len());
                DraftBoard {
                    order,
                    picks: file.picks,
                    buyins: file.buyins,
                }
            }
            Err(e) => {
                warn!("No usable {}, generating straight order: {}", DRAFT_PICKS_FILE, e);
                DraftBoard::straight(order)
            }
        }
    }

    pub fn round(&self, round: u32) -> Vec<&DraftPick> {
        self.picks.iter().filter(|p| p.round == round).collect()
    }

    /// Picks currently owned by `team`, in pick order.
    pub fn picks_for(&self, team: &str) -> Vec<&DraftPick> {
        let mut picks: Vec<&DraftPick> = self
            .picks
            .iter()
            .filter(|p| p.current_owner == team)
            .collect();
        picks.sort_by_key(|p| p.pick);
        picks
    }

    pub fn bought_in(&self, team: &str, round: u32) -> bool {
        self.buyins.get(team).is_some_and(|r| r.contains(&round))
    }

    /// Buy-in rounds `team` has completed, out of `BUY_IN_COSTS.len()`.
    pub fn buy_ins_completed(&self, team: &str) -> usize {
        BUY_IN_COSTS
            .iter()
            .filter(|(round, _)| self.bought_in(team, *round))
            .count()
    }

    pub fn traded_count(&self, team: &str) -> usize {
        self.picks_for(team).iter().filter(|p| p.is_traded()).count()
    }
}

fn default_order() -> Vec<String> {
    DEFAULT_ORDER.iter().map(|t| t.to_string()).collect()
}
