//! League schedule. Read-only match metadata.
//!
//! Loaded once from `data/schedule/*.json`. Dates and start times are
//! in the league's reference timezone; nothing here converts them.

use crate::types::MatchNumber;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How long before the first ball a match alert goes out.
pub const ALERT_LEAD_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchInfo {
    pub match_number: MatchNumber,
    pub date: NaiveDate,
    pub day: String,
    pub start_time: NaiveTime,
    pub home_team: String,
    pub away_team: String,
    pub venue: String,
}

impl MatchInfo {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn alert_time(&self) -> NaiveDateTime {
        self.starts_at() - Duration::minutes(ALERT_LEAD_MINUTES)
    }

    /// e.g. "KKR vs RCB"
    pub fn fixture(&self) -> String {
        format!("{} vs {}", team_acronym(&self.home_team), team_acronym(&self.away_team))
    }
}

/// What the policy gate needs from a schedule.
pub trait ScheduleLookup {
    fn lookup(&self, match_number: MatchNumber) -> Option<MatchInfo>;

    /// Every match on `date`, in match-number order.
    fn matches_on(&self, date: NaiveDate) -> Vec<MatchInfo>;
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleFile {
    matches: Vec<ScheduleRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleRow {
    match_no: MatchNumber,
    date: NaiveDate,
    day: String,
    /// "7:30 PM"
    start: String,
    home: String,
    away: String,
    venue: String,
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    matches: BTreeMap<MatchNumber, MatchInfo>,
}

impl Schedule {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let schedule = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid schedule {path}: {e}"))?;
        log::info!("Loaded {} scheduled match(es) from {path}", schedule.len());
        Ok(schedule)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let file: ScheduleFile = serde_json::from_str(content)?;
        let mut matches = BTreeMap::new();
        for row in file.matches {
            let start_time = NaiveTime::parse_from_str(row.start.trim(), "%I:%M %p")
                .map_err(|e| anyhow::anyhow!("match {}: bad start time {:?}: {e}", row.match_no, row.start))?;
            let info = MatchInfo {
                match_number: row.match_no,
                date: row.date,
                day: row.day,
                start_time,
                home_team: row.home.trim().to_string(),
                away_team: row.away.trim().to_string(),
                venue: row.venue.trim().to_string(),
            };
            if matches.insert(row.match_no, info).is_some() {
                anyhow::bail!("match {} appears twice", row.match_no);
            }
        }
        Ok(Self { matches })
    }

    /// Match numbers in `1..=max_match_number` with no fixture.
    pub fn missing_matches(&self, max_match_number: MatchNumber) -> Vec<MatchNumber> {
        (1..=max_match_number)
            .filter(|m| !self.matches.contains_key(m))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl ScheduleLookup for Schedule {
    fn lookup(&self, match_number: MatchNumber) -> Option<MatchInfo> {
        self.matches.get(&match_number).cloned()
    }

    fn matches_on(&self, date: NaiveDate) -> Vec<MatchInfo> {
        self.matches.values().filter(|m| m.date == date).cloned().collect()
    }
}

/// Short name for a franchise; unknown names pass through.
pub fn team_acronym(team: &str) -> &str {
    match team.trim() {
        "Kolkata Knight Riders" => "KKR",
        "Royal Challengers Bengaluru" => "RCB",
        "Sunrisers Hyderabad" => "SRH",
        "Rajasthan Royals" => "RR",
        "Chennai Super Kings" => "CSK",
        "Mumbai Indians" => "MI",
        "Delhi Capitals" => "DC",
        "Lucknow Super Giants" => "LSG",
        "Gujarat Titans" => "GT",
        "Punjab Kings" => "PBKS",
        other => other,
    }
}
