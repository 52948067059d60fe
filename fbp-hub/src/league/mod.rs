// League domain: teams, players, contracts, standings and the season calendar.

pub mod contract;
pub mod player;
pub mod season;
pub mod standings;
pub mod team;
