// League standings and weekly matchups (standings.json).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub standings: Vec<StandingRow>,
    /// Free-form matchup lines such as `"WIZ 5 vs B2J 4"`.
    #[serde(default)]
    pub matchups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team: String,
    pub rank: u32,
    #[serde(default)]
    pub record: String,
    #[serde(default)]
    pub win_pct: f64,
}

/// One side of a matchup line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchupSide {
    pub team: String,
    pub score: String,
}

/// Parse `"WIZ 5 vs B2J 4"` into both sides. A missing score reads as "0".
/// Returns `None` when the line has no single `" vs "` separator.
pub fn parse_matchup(line: &str) -> Option<(MatchupSide, MatchupSide)> {
    let parts: Vec<&str> = line.split(" vs ").collect();
    if parts.len() != 2 {
        return None;
    }
    let side = |raw: &str| {
        let mut tokens = raw.split_whitespace();
        let team = tokens.next()?.to_string();
        let score = tokens.next().unwrap_or("0").to_string();
        Some(MatchupSide { team, score })
    };
    Some((side(parts[0])?, side(parts[1])?))
}

impl Standings {
    pub fn parsed_matchups(&self) -> Vec<(MatchupSide, MatchupSide)> {
        self.matchups.iter().filter_map(|m| parse_matchup(m)).collect()
    }

    /// Current rank of `team`, if listed.
    pub fn rank_of(&self, team: &str) -> Option<u32> {
        self.standings.iter().find(|r| r.team == team).map(|r| r.rank)
    }

    /// Teams ordered worst record first, which is the waiver/auction
    /// priority order.
    pub fn worst_first(&self) -> Vec<&StandingRow> {
        let mut rows: Vec<&StandingRow> = self.standings.iter().collect();
        rows.sort_by(|a, b| b.rank.cmp(&a.rank));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(team: &str, rank: u32) -> StandingRow {
        StandingRow {
            team: team.into(),
            rank,
            record: String::new(),
            win_pct: 0.0,
        }
    }

    #[test]
    fn parses_full_matchup() {
        let (a, b) = parse_matchup("WIZ 5 vs B2J 4").unwrap();
        assert_eq!(a, MatchupSide { team: "WIZ".into(), score: "5".into() });
        assert_eq!(b, MatchupSide { team: "B2J".into(), score: "4".into() });
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        let (a, b) = parse_matchup("HAM vs  RV").unwrap();
        assert_eq!(a.score, "0");
        assert_eq!(b.team, "RV");
        assert_eq!(b.score, "0");
    }

    #[test]
    fn malformed_matchup_is_skipped() {
        assert!(parse_matchup("WIZ 5 - B2J 4").is_none());
        assert!(parse_matchup(" vs B2J").is_none());
        let standings = Standings {
            matchups: vec!["garbage".into(), "WIZ 1 vs HAM 2".into()],
            ..Default::default()
        };
        assert_eq!(standings.parsed_matchups().len(), 1);
    }

    #[test]
    fn worst_first_orders_by_descending_rank() {
        let standings = Standings {
            standings: vec![row("WIZ", 1), row("HAM", 3), row("RV", 2)],
            ..Default::default()
        };
        let order: Vec<&str> = standings.worst_first().iter().map(|r| r.team.as_str()).collect();
        assert_eq!(order, vec!["HAM", "RV", "WIZ"]);
        assert_eq!(standings.rank_of("RV"), Some(2));
        assert_eq!(standings.rank_of("SAD"), None);
    }
}
