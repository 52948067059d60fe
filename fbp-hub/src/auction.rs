// Weekly prospect auction: the originating-bid / challenge-bid calendar, bid
// rules, the claim board and the priority order.
//
// The week runs Monday 15:00 (OB window opens) through Sunday (processing).
// Challenge bids are accepted Wednesday through Friday 21:00.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::{self, DataSource, LeagueData, AUCTION_FILE};
use crate::league::player::{Player, PlayerType};
use crate::league::team::TeamDirectory;

pub const MIN_ORIGINATING_BID: u32 = 10;
pub const BID_INCREMENT: u32 = 5;
/// Challenge bids close at this hour on Friday.
pub const CB_CLOSE_HOUR: u32 = 21;
const OB_OPEN_HOUR: u32 = 15;

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionPhase {
    ObOpen,
    ObClosingSoon,
    CbActive,
    ObFinalWindow,
    Processing,
    Closed,
}

impl AuctionPhase {
    pub fn at(now: NaiveDateTime) -> Self {
        match now.weekday() {
            Weekday::Mon if now.hour() >= OB_OPEN_HOUR => AuctionPhase::ObOpen,
            Weekday::Mon => AuctionPhase::Closed,
            Weekday::Tue => AuctionPhase::ObClosingSoon,
            Weekday::Wed | Weekday::Thu | Weekday::Fri => AuctionPhase::CbActive,
            Weekday::Sat => AuctionPhase::ObFinalWindow,
            Weekday::Sun => AuctionPhase::Processing,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            AuctionPhase::ObOpen => "OB Open",
            AuctionPhase::ObClosingSoon => "OB Closing Soon",
            AuctionPhase::CbActive => "CB Active",
            AuctionPhase::ObFinalWindow => "OB Final Window",
            AuctionPhase::Processing => "Processing",
            AuctionPhase::Closed => "Closed",
        }
    }
}

impl fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Countdown caption for the auction timer.
pub fn next_deadline(now: NaiveDateTime) -> &'static str {
    match now.weekday() {
        Weekday::Mon => "OB ends Tuesday 11:59pm",
        Weekday::Tue => "CB starts Wednesday",
        Weekday::Wed | Weekday::Thu => "CB ends Friday 9pm",
        Weekday::Fri => "OB final window Saturday",
        Weekday::Sat => "Results Sunday",
        Weekday::Sun => "Opens Monday 3pm",
    }
}

fn challenge_window_open(now: NaiveDateTime) -> bool {
    match now.weekday() {
        Weekday::Wed | Weekday::Thu => true,
        Weekday::Fri => now.hour() < CB_CLOSE_HOUR,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBid {
    pub bidder: String,
    pub amount: u32,
}

/// One prospect under claim this week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub prospect: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team: String,
    pub originating_bidder: String,
    pub high_bid: u32,
    pub high_bidder: String,
    #[serde(default)]
    pub challenge_bids: Vec<ChallengeBid>,
}

impl Claim {
    /// `team` placed the OB or any challenge on this claim.
    pub fn involves(&self, team: &str) -> bool {
        self.originating_bidder == team || self.challenge_bids.iter().any(|cb| cb.bidder == team)
    }

    pub fn is_winning(&self, team: &str) -> bool {
        self.high_bidder == team
    }

    pub fn min_challenge(&self) -> u32 {
        self.high_bid + BID_INCREMENT
    }
}

/// A challenge is possible during the CB window by anyone but the
/// originating bidder.
pub fn can_challenge(claim: &Claim, team: &str, now: NaiveDateTime) -> bool {
    challenge_window_open(now) && claim.originating_bidder != team
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error("minimum bid is ${min}")]
    BelowMinimum { min: u32 },

    #[error("bids must be in ${step} increments")]
    BadIncrement { step: u32 },

    #[error("insufficient balance: ${amount} bid, ${balance} available")]
    InsufficientBalance { amount: u32, balance: i64 },

    #[error("challenge window is closed")]
    WindowClosed,

    #[error("cannot challenge your own originating bid")]
    OwnClaim,
}

fn check_amount(amount: u32, min: u32, balance: i64) -> Result<(), BidError> {
    if amount < min {
        return Err(BidError::BelowMinimum { min });
    }
    if amount % BID_INCREMENT != 0 {
        return Err(BidError::BadIncrement {
            step: BID_INCREMENT,
        });
    }
    if i64::from(amount) > balance {
        return Err(BidError::InsufficientBalance { amount, balance });
    }
    Ok(())
}

pub fn validate_originating_bid(amount: u32, balance: i64) -> Result<(), BidError> {
    check_amount(amount, MIN_ORIGINATING_BID, balance)
}

pub fn validate_challenge_bid(
    claim: &Claim,
    team: &str,
    amount: u32,
    balance: i64,
    now: NaiveDateTime,
) -> Result<(), BidError> {
    if claim.originating_bidder == team {
        return Err(BidError::OwnClaim);
    }
    if !challenge_window_open(now) {
        return Err(BidError::WindowClosed);
    }
    check_amount(amount, claim.min_challenge(), balance)
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableProspect {
    #[serde(default)]
    pub upid: String,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team: String,
}

impl From<&Player> for AvailableProspect {
    fn from(p: &Player) -> Self {
        AvailableProspect {
            upid: p.upid.clone(),
            name: p.name.clone(),
            position: p.position.clone(),
            team: p.team.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub rank: u32,
    pub team: String,
    #[serde(default)]
    pub balance: i64,
}

/// Farm players no manager holds. A blank manager counts as unowned.
pub fn eligible_prospects(players: &[Player]) -> Vec<&Player> {
    players
        .iter()
        .filter(|p| p.player_type == Some(PlayerType::Farm) && p.owner().is_none())
        .collect()
}

/// Worst standing first, numbered from 1, with each team's balance.
pub fn priority_order(league: &LeagueData, teams: &TeamDirectory) -> Vec<PriorityEntry> {
    league
        .standings
        .worst_first()
        .into_iter()
        .zip(1..)
        .map(|(row, rank)| PriorityEntry {
            rank,
            team: row.team.clone(),
            balance: league.balance_of(teams, &row.team),
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuctionFile {
    #[serde(default)]
    claims: Vec<Claim>,
    #[serde(default)]
    available: Vec<AvailableProspect>,
    #[serde(default)]
    priority: Vec<PriorityEntry>,
}

/// This week's claims, open prospects and priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionBoard {
    pub claims: Vec<Claim>,
    pub available: Vec<AvailableProspect>,
    pub priority: Vec<PriorityEntry>,
}

impl AuctionBoard {
    /// auction_current.json when published, otherwise derived from the
    /// player pool and standings with no claims.
    pub async fn load(source: &dyn DataSource, league: &LeagueData, teams: &TeamDirectory) -> Self {
        match data::load::<AuctionFile>(source, AUCTION_FILE).await {
            Ok(file) => AuctionBoard {
                claims: file.claims,
                available: file.available,
                priority: file.priority,
            },
            Err(e) => {
                debug!("No published auction ({}), deriving board", e);
                AuctionBoard::derived(league, teams)
            }
        }
    }

    pub fn derived(league: &LeagueData, teams: &TeamDirectory) -> Self {
        AuctionBoard {
            claims: Vec::new(),
            available: eligible_prospects(&league.players)
                .into_iter()
                .map(AvailableProspect::from)
                .collect(),
            priority: priority_order(league, teams),
        }
    }

    pub fn claims_for(&self, team: &str) -> Vec<&Claim> {
        self.claims.iter().filter(|c| c.involves(team)).collect()
    }

    /// 1-based priority position, if ranked.
    pub fn priority_of(&self, team: &str) -> Option<u32> {
        self.priority.iter().find(|p| p.team == team).map(|p| p.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::player::tests::player;
    use crate::league::standings::{StandingRow, Standings};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    // 2026-03-02 is a Monday.
    fn at(day_offset: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2 + day_offset)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn claim() -> Claim {
        Claim {
            prospect: "Kid Rocket".into(),
            position: "SP".into(),
            team: "CIN".into(),
            originating_bidder: "HAM".into(),
            high_bid: 20,
            high_bidder: "HAM".into(),
            challenge_bids: vec![ChallengeBid {
                bidder: "B2J".into(),
                amount: 15,
            }],
        }
    }

    #[test]
    fn phases_across_the_week() {
        assert_eq!(AuctionPhase::at(at(0, 9)), AuctionPhase::Closed);
        assert_eq!(AuctionPhase::at(at(0, 15)), AuctionPhase::ObOpen);
        assert_eq!(AuctionPhase::at(at(1, 0)), AuctionPhase::ObClosingSoon);
        assert_eq!(AuctionPhase::at(at(2, 12)), AuctionPhase::CbActive);
        assert_eq!(AuctionPhase::at(at(4, 22)), AuctionPhase::CbActive);
        assert_eq!(AuctionPhase::at(at(5, 12)), AuctionPhase::ObFinalWindow);
        assert_eq!(AuctionPhase::at(at(6, 12)).to_string(), "Processing");
    }

    #[test]
    fn deadline_captions() {
        assert_eq!(next_deadline(at(0, 16)), "OB ends Tuesday 11:59pm");
        assert_eq!(next_deadline(at(3, 10)), "CB ends Friday 9pm");
        assert_eq!(next_deadline(at(6, 10)), "Opens Monday 3pm");
    }

    #[test]
    fn challenge_window() {
        let c = claim();
        assert!(can_challenge(&c, "WIZ", at(2, 10)));
        assert!(can_challenge(&c, "WIZ", at(4, 20)));
        assert!(!can_challenge(&c, "WIZ", at(4, 21)));
        assert!(!can_challenge(&c, "WIZ", at(1, 10)));
        assert!(!can_challenge(&c, "HAM", at(2, 10)));
    }

    #[test]
    fn originating_bid_rules() {
        assert_eq!(validate_originating_bid(10, 100), Ok(()));
        assert_eq!(
            validate_originating_bid(5, 100),
            Err(BidError::BelowMinimum { min: 10 })
        );
        assert_eq!(
            validate_originating_bid(12, 100),
            Err(BidError::BadIncrement { step: 5 })
        );
        assert_eq!(
            validate_originating_bid(40, 35),
            Err(BidError::InsufficientBalance {
                amount: 40,
                balance: 35
            })
        );
    }

    #[test]
    fn challenge_bid_rules() {
        let c = claim();
        let wed = at(2, 12);
        assert_eq!(validate_challenge_bid(&c, "WIZ", 25, 100, wed), Ok(()));
        assert_eq!(
            validate_challenge_bid(&c, "WIZ", 20, 100, wed),
            Err(BidError::BelowMinimum { min: 25 })
        );
        assert_eq!(
            validate_challenge_bid(&c, "HAM", 25, 100, wed),
            Err(BidError::OwnClaim)
        );
        assert_eq!(
            validate_challenge_bid(&c, "WIZ", 25, 100, at(5, 9)),
            Err(BidError::WindowClosed)
        );
    }

    #[test]
    fn claim_involvement() {
        let c = claim();
        assert!(c.involves("HAM"));
        assert!(c.involves("B2J"));
        assert!(!c.involves("WIZ"));
        assert!(c.is_winning("HAM"));
        assert!(!c.is_winning("B2J"));
    }

    #[test]
    fn derived_board_uses_free_farm_players_and_worst_first_priority() {
        let mut free = player("9", "Free Agent Prospect", "HAM", PlayerType::Farm, "");
        free.manager = None;
        free.fbp_team = None;
        let owned = player("10", "Owned Prospect", "HAM", PlayerType::Farm, "PC");
        let mlb = player("11", "Big Leaguer", "WIZ", PlayerType::Mlb, "VC-1");

        let league = LeagueData {
            players: vec![free, owned, mlb],
            standings: Standings {
                standings: vec![
                    StandingRow { team: "WIZ".into(), rank: 1, record: String::new(), win_pct: 0.6 },
                    StandingRow { team: "HAM".into(), rank: 3, record: String::new(), win_pct: 0.4 },
                    StandingRow { team: "B2J".into(), rank: 2, record: String::new(), win_pct: 0.5 },
                ],
                ..Default::default()
            },
            wizbucks: HashMap::from([("Hammers".to_string(), 80)]),
        };
        let teams = crate::league::team::tests::sample_directory();
        let board = AuctionBoard::derived(&league, &teams);

        assert_eq!(board.available.len(), 1);
        assert_eq!(board.available[0].name, "Free Agent Prospect");
        let order: Vec<&str> = board.priority.iter().map(|p| p.team.as_str()).collect();
        assert_eq!(order, vec!["HAM", "B2J", "WIZ"]);
        assert_eq!(board.priority[0].balance, 80);
        assert_eq!(board.priority_of("WIZ"), Some(3));
        assert!(board.claims_for("HAM").is_empty());
    }

    #[test]
    fn blank_manager_counts_as_unowned() {
        let mut blank = player("20", "Blank Manager", "", PlayerType::Farm, "");
        blank.fbp_team = None;
        let mut null = player("21", "Null Manager", "HAM", PlayerType::Farm, "");
        null.manager = None;
        null.fbp_team = None;
        let owned = player("22", "Owned", "HAM", PlayerType::Farm, "PC");

        let players = vec![blank, null, owned];
        let names: Vec<&str> = eligible_prospects(&players).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Blank Manager", "Null Manager"]);
    }
}
