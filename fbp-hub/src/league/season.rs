// Season calendar (season_dates.json) and the date labels shown next to it.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Raw season_dates.json: top-level ISO dates plus a nested `auction` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonDates {
    #[serde(default)]
    pub auction: HashMap<String, String>,
    #[serde(flatten)]
    pub dates: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Season,
    Auction,
}

/// Events shown on the calendar, in display order before sorting.
const EVENTS: &[(&str, &str, Source)] = &[
    ("pad_open_date", "PAD Opens", Source::Season),
    ("pad_date", "Prospect Assignment Day", Source::Season),
    ("ppd_date", "Prospect Draft", Source::Season),
    ("franchise_tag_date", "Franchise Tag Deadline", Source::Season),
    ("trade_window_start", "Trade Window Opens", Source::Season),
    ("trade_window_end", "Trade Window Closes", Source::Season),
    ("kap_open_date", "KAP Opens", Source::Season),
    ("keeper_deadline", "Keeper Deadline", Source::Season),
    ("kap_end_date", "KAP Deadline", Source::Season),
    ("keeper_draft", "Keeper Draft", Source::Season),
    ("division_draft", "Division Draft", Source::Season),
    ("week_1_start", "Week 1 Starts", Source::Season),
    ("regular_season_end", "Final Day of Regular Season", Source::Season),
    ("playoffs_end", "Playoffs End", Source::Season),
    ("start", "Prospect Auction Start", Source::Auction),
    ("all_star_break_start", "Auction Pauses - All-Star Break", Source::Auction),
    ("restart", "Prospect Auction Restart", Source::Auction),
    ("playoffs_start", "Auctions End for Playoffs", Source::Auction),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonEvent {
    pub key: &'static str,
    pub label: &'static str,
    pub date: NaiveDate,
}

impl SeasonDates {
    fn raw(&self, key: &str, source: Source) -> Option<&str> {
        match source {
            Source::Season => self.dates.get(key).and_then(|v| v.as_str()),
            Source::Auction => self.auction.get(key).map(String::as_str),
        }
    }

    /// Known events with a parseable date, earliest first.
    pub fn events(&self) -> Vec<SeasonEvent> {
        let mut events: Vec<SeasonEvent> = EVENTS
            .iter()
            .filter_map(|&(key, label, source)| {
                let raw = self.raw(key, source)?;
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
                Some(SeasonEvent { key, label, date })
            })
            .collect();
        events.sort_by_key(|e| e.date);
        events
    }

    /// First event on or after `today`.
    pub fn next_deadline(&self, today: NaiveDate) -> Option<SeasonEvent> {
        self.events().into_iter().find(|e| e.date >= today)
    }

    pub fn date_of(&self, key: &str) -> Option<NaiveDate> {
        self.events().into_iter().find(|e| e.key == key).map(|e| e.date)
    }
}

/// Countdown label for the deadline banner.
pub fn days_until_label(date: NaiveDate, today: NaiveDate) -> String {
    let days = (date - today).num_days();
    match days {
        0 => "Today!".to_string(),
        1 => "Tomorrow".to_string(),
        d if (2..7).contains(&d) => format!("In {d} days"),
        _ => format_date(date),
    }
}

/// Deadlines three days out or closer are highlighted.
pub fn is_urgent(date: NaiveDate, today: NaiveDate) -> bool {
    (date - today).num_days() <= 3
}

/// `Feb 10, 2026` style date.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// "Just now", "N minutes ago" and so on, falling back to the date after a
/// week.
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 60 {
        "Just now".to_string()
    } else if secs < 3_600 {
        format!("{} minutes ago", secs / 60)
    } else if secs < 86_400 {
        format!("{} hours ago", secs / 3_600)
    } else if secs < 604_800 {
        format!("{} days ago", secs / 86_400)
    } else {
        format_date(then.date_naive())
    }
}
