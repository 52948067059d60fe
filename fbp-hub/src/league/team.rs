// Team directory: abbreviations, display names, managers and colours.

use std::collections::HashMap;

use crate::config::LeagueConfig;

/// Accent colour used when a team has none configured.
pub const DEFAULT_TEAM_COLOR: &str = "#FF8C42";

/// A single franchise as seen by the rest of the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub abbr: String,
    pub name: String,
    pub discord_id: String,
    pub color: String,
}

/// Lookup tables over the configured teams. Insertion order is preserved so
/// `teams()` matches the order in league.toml.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    teams: Vec<Team>,
    by_abbr: HashMap<String, usize>,
    by_discord: HashMap<String, usize>,
    commissioners: Vec<String>,
}

impl TeamDirectory {
    pub fn from_config(league: &LeagueConfig) -> Self {
        let teams = league
            .teams
            .iter()
            .map(|t| Team {
                abbr: t.abbr.clone(),
                name: t.name.clone(),
                discord_id: t.discord_id.clone(),
                color: t.color.clone(),
            })
            .collect();
        Self::new(teams, league.commissioners.clone())
    }

    pub fn new(teams: Vec<Team>, commissioners: Vec<String>) -> Self {
        let mut by_abbr = HashMap::new();
        let mut by_discord = HashMap::new();
        for (idx, team) in teams.iter().enumerate() {
            by_abbr.insert(team.abbr.clone(), idx);
            by_discord.insert(team.discord_id.clone(), idx);
        }
        TeamDirectory {
            teams,
            by_abbr,
            by_discord,
            commissioners,
        }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn abbreviations(&self) -> Vec<String> {
        self.teams.iter().map(|t| t.abbr.clone()).collect()
    }

    pub fn get(&self, abbr: &str) -> Option<&Team> {
        self.by_abbr.get(abbr).map(|&idx| &self.teams[idx])
    }

    /// The team managed by the given Discord user, if any.
    pub fn team_for_discord(&self, discord_id: &str) -> Option<&Team> {
        self.by_discord.get(discord_id).map(|&idx| &self.teams[idx])
    }

    /// Display name for an abbreviation, falling back to the abbreviation.
    pub fn name_of<'a>(&'a self, abbr: &'a str) -> &'a str {
        self.get(abbr).map(|t| t.name.as_str()).unwrap_or(abbr)
    }

    /// Reverse lookup from a full team name (as used in wizbucks.json).
    pub fn abbr_for_name(&self, name: &str) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.abbr.as_str())
    }

    pub fn color_of(&self, abbr: &str) -> &str {
        self.get(abbr)
            .map(|t| t.color.as_str())
            .unwrap_or(DEFAULT_TEAM_COLOR)
    }

    pub fn is_commissioner(&self, discord_id: &str) -> bool {
        self.commissioners.iter().any(|c| c == discord_id)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small three-team directory shared by tests in other modules.
    pub(crate) fn sample_directory() -> TeamDirectory {
        let team = |abbr: &str, name: &str, id: &str, color: &str| Team {
            abbr: abbr.into(),
            name: name.into(),
            discord_id: id.into(),
            color: color.into(),
        };
        TeamDirectory::new(
            vec![
                team("HAM", "Hammers", "347571660230230017", "#F38181"),
                team("WIZ", "Whiz Kids", "161967242118955008", "#FF8C42"),
                team("B2J", "Btwn2Jackies", "689952988957245578", "#4ECDC4"),
            ],
            vec!["161967242118955008".into()],
        )
    }

    #[test]
    fn maps_discord_id_to_team() {
        let dir = sample_directory();
        assert_eq!(dir.team_for_discord("347571660230230017").unwrap().abbr, "HAM");
        assert!(dir.team_for_discord("000").is_none());
    }

    #[test]
    fn name_and_reverse_lookup() {
        let dir = sample_directory();
        assert_eq!(dir.name_of("B2J"), "Btwn2Jackies");
        assert_eq!(dir.name_of("XXX"), "XXX");
        assert_eq!(dir.abbr_for_name("Whiz Kids"), Some("WIZ"));
        assert_eq!(dir.abbr_for_name("Nobody"), None);
    }

    #[test]
    fn unknown_team_gets_default_colour() {
        let dir = sample_directory();
        assert_eq!(dir.color_of("B2J"), "#4ECDC4");
        assert_eq!(dir.color_of("ZZZ"), DEFAULT_TEAM_COLOR);
    }

    #[test]
    fn commissioner_check() {
        let dir = sample_directory();
        assert!(dir.is_commissioner("161967242118955008"));
        assert!(!dir.is_commissioner("347571660230230017"));
    }

    #[test]
    fn preserves_configured_order() {
        let dir = sample_directory();
        assert_eq!(dir.abbreviations(), vec!["HAM", "WIZ", "B2J"]);
        assert_eq!(dir.len(), 3);
    }
}
