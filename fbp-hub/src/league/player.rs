// Player records from combined_players.json and the roster queries built on
// top of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether a player is on the MLB roster or in the farm system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    #[serde(rename = "MLB")]
    Mlb,
    Farm,
}

impl PlayerType {
    pub fn from_str_type(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MLB" => Some(PlayerType::Mlb),
            "FARM" => Some(PlayerType::Farm),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            PlayerType::Mlb => "MLB",
            PlayerType::Farm => "Farm",
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One row of combined_players.json. Every field except `name` is optional
/// in the export, so missing values deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default, deserialize_with = "string_or_number")]
    pub upid: String,
    pub name: String,
    /// MLB organisation abbreviation.
    #[serde(default)]
    pub team: String,
    /// Slash-separated eligibility, e.g. `"2B/SS"`.
    #[serde(default)]
    pub position: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub age: Option<u32>,
    /// Fantasy manager abbreviation, `None` for free agents.
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(rename = "FBP_Team", default)]
    pub fbp_team: Option<String>,
    #[serde(default, deserialize_with = "lenient_player_type")]
    pub player_type: Option<PlayerType>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub years_simple: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub top_100_rank: Option<u32>,
    /// Absent means the player is still rookie-eligible.
    #[serde(rename = "MLBRookie", default)]
    pub mlb_rookie: Option<bool>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub has_mlb_service: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub service_time_days: Option<u32>,
}

impl Player {
    /// Owning fantasy team, preferring `FBP_Team` over `manager`.
    pub fn owner(&self) -> Option<&str> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|s| !s.is_empty())
        }
        present(&self.fbp_team).or_else(|| present(&self.manager))
    }

    pub fn is_farm(&self) -> bool {
        self.player_type == Some(PlayerType::Farm)
    }

    pub fn is_mlb(&self) -> bool {
        self.player_type == Some(PlayerType::Mlb)
    }

    pub fn is_rookie(&self) -> bool {
        self.mlb_rookie.unwrap_or(true)
    }

    pub fn has_service_time(&self) -> bool {
        self.has_mlb_service || self.service_time_days.unwrap_or(0) > 0
    }

    /// Development contracts signed before the contract overhaul.
    pub fn is_legacy_dc(&self) -> bool {
        matches!(
            self.contract_type.as_deref(),
            Some("Development Cont.") | Some("Development Contract")
        )
    }

    pub fn positions(&self) -> impl Iterator<Item = &str> {
        self.position
            .split('/')
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Criteria for the players page. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub player_type: Option<PlayerType>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub manager: Option<String>,
    pub search: Option<String>,
}

impl PlayerFilter {
    pub fn matches(&self, player: &Player) -> bool {
        if let Some(pt) = self.player_type {
            if player.player_type != Some(pt) {
                return false;
            }
        }
        if let Some(pos) = self.position.as_deref() {
            if !player.positions().any(|p| p.eq_ignore_ascii_case(pos)) {
                return false;
            }
        }
        if let Some(team) = self.team.as_deref() {
            if player.team != team {
                return false;
            }
        }
        if let Some(manager) = self.manager.as_deref() {
            if player.manager.as_deref() != Some(manager) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !player.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, players: &'a [Player]) -> Vec<&'a Player> {
        players.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Fields that the players page offers as dropdown filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerField {
    Team,
    Position,
    Manager,
    ContractType,
}

/// Distinct non-empty values of `field`, sorted.
pub fn unique_values(players: &[Player], field: PlayerField) -> Vec<String> {
    let mut values = BTreeSet::new();
    for player in players {
        let value = match field {
            PlayerField::Team => Some(player.team.as_str()),
            PlayerField::Position => Some(player.position.as_str()),
            PlayerField::Manager => player.manager.as_deref(),
            PlayerField::ContractType => player.contract_type.as_deref(),
        };
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            values.insert(v.to_string());
        }
    }
    values.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Roster queries
// ---------------------------------------------------------------------------

/// All players owned by `team`, optionally restricted to one player type.
pub fn team_roster<'a>(
    players: &'a [Player],
    team: &str,
    player_type: Option<PlayerType>,
) -> Vec<&'a Player> {
    players
        .iter()
        .filter(|p| p.owner() == Some(team))
        .filter(|p| player_type.is_none_or(|pt| p.player_type == Some(pt)))
        .collect()
}

pub fn farm_count(players: &[Player]) -> usize {
    players.iter().filter(|p| p.is_farm()).count()
}

/// Human-readable roster capacity line for an MLB roster of `count` players.
pub fn roster_status(count: usize, limit: usize) -> String {
    if count > limit {
        format!("Over limit by {}", count - limit)
    } else if count == limit {
        "At maximum".to_string()
    } else {
        format!("{} spots available", limit - count)
    }
}

/// `upid` is a string in newer exports and a number in older ones.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Blank or unrecognised types read as `None` instead of failing the row.
fn lenient_player_type<'de, D>(deserializer: D) -> Result<Option<PlayerType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(PlayerType::from_str_type))
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Non-negative counts exported as numbers, numeric strings, `""` or null.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn player(upid: &str, name: &str, owner: &str, pt: PlayerType, contract: &str) -> Player {
        Player {
            upid: upid.into(),
            name: name.into(),
            team: "NYY".into(),
            position: "SS".into(),
            age: Some(24),
            manager: Some(owner.into()),
            fbp_team: Some(owner.into()),
            player_type: Some(pt),
            contract_type: Some(contract.into()),
            years_simple: None,
            level: None,
            top_100_rank: None,
            mlb_rookie: None,
            has_mlb_service: false,
            service_time_days: None,
        }
    }

    fn sample() -> Vec<Player> {
        let mut a = player("1", "Aaron Judge", "WIZ", PlayerType::Mlb, "FC-2");
        a.position = "OF".into();
        let mut b = player("2", "Gunnar Henderson", "HAM", PlayerType::Mlb, "VC-1");
        b.team = "BAL".into();
        b.position = "SS/3B".into();
        let c = player("3", "Leo De Vries", "WIZ", PlayerType::Farm, "PC");
        vec![a, b, c]
    }

    #[test]
    fn deserializes_export_row() {
        let p: Player = serde_json::from_value(json!({
            "upid": 1234,
            "name": "Jackson Holliday",
            "team": "BAL",
            "position": "2B",
            "manager": "B2J",
            "FBP_Team": "B2J",
            "player_type": "Farm",
            "contract_type": "Development Cont.",
            "MLBRookie": false
        }))
        .unwrap();
        assert_eq!(p.upid, "1234");
        assert!(p.is_farm());
        assert!(p.is_legacy_dc());
        assert!(!p.is_rookie());
        assert_eq!(p.owner(), Some("B2J"));
    }

    #[test]
    fn missing_rookie_flag_means_rookie() {
        let p: Player = serde_json::from_value(json!({"name": "X"})).unwrap();
        assert!(p.is_rookie());
        assert!(p.owner().is_none());
    }

    #[test]
    fn blank_fbp_team_falls_back_to_manager() {
        let mut p = player("7", "Jackson Chourio", "HAM", PlayerType::Mlb, "FC-1");
        p.fbp_team = Some(String::new());
        assert_eq!(p.owner(), Some("HAM"));

        p.manager = Some(String::new());
        assert_eq!(p.owner(), None);
    }

    #[test]
    fn blank_and_null_fields_do_not_reject_the_row() {
        let p: Player = serde_json::from_value(json!({
            "upid": "55",
            "name": "Roki Sasaki",
            "player_type": "",
            "age": "",
            "top_100_rank": "12",
            "has_mlb_service": null,
            "service_time_days": null
        }))
        .unwrap();
        assert_eq!(p.player_type, None);
        assert_eq!(p.age, None);
        assert_eq!(p.top_100_rank, Some(12));
        assert!(!p.has_mlb_service);
        assert_eq!(p.service_time_days, None);
    }

    #[test]
    fn filter_combines_criteria() {
        let players = sample();
        let filter = PlayerFilter {
            manager: Some("WIZ".into()),
            player_type: Some(PlayerType::Mlb),
            ..Default::default()
        };
        let hits = filter.apply(&players);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Aaron Judge");
    }

    #[test]
    fn search_is_case_insensitive() {
        let players = sample();
        let filter = PlayerFilter {
            search: Some("  hEnDeR ".into()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&players).len(), 1);
    }

    #[test]
    fn position_filter_matches_any_eligibility() {
        let players = sample();
        let filter = PlayerFilter {
            position: Some("3B".into()),
            ..Default::default()
        };
        let hits = filter.apply(&players);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].upid, "2");
    }

    #[test]
    fn unique_values_sorted_and_deduped() {
        let players = sample();
        assert_eq!(unique_values(&players, PlayerField::Manager), vec!["HAM", "WIZ"]);
        assert_eq!(unique_values(&players, PlayerField::Team), vec!["BAL", "NYY"]);
    }

    #[test]
    fn roster_queries() {
        let players = sample();
        assert_eq!(team_roster(&players, "WIZ", None).len(), 2);
        assert_eq!(team_roster(&players, "WIZ", Some(PlayerType::Farm)).len(), 1);
        assert_eq!(farm_count(&players), 1);
    }

    #[test]
    fn roster_status_lines() {
        assert_eq!(roster_status(28, 26), "Over limit by 2");
        assert_eq!(roster_status(26, 26), "At maximum");
        assert_eq!(roster_status(20, 26), "6 spots available");
    }
}
