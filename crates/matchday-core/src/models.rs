use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Status of a listed match, classified from the schedule's status cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    /// In progress; `minute` is the displayed running-clock text.
    Live {
        minute: String,
    },
    Finished,
    Cancelled,
    Unknown,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "not_started",
            MatchStatus::Live { .. } => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Unknown => "unknown",
        }
    }

    /// Extra display detail (the running minute for live matches).
    pub fn detail(&self) -> Option<&str> {
        match self {
            MatchStatus::Live { minute } if !minute.is_empty() => Some(minute),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(minute) => write!(f, "{} ({})", self.as_str(), minute),
            None => write!(f, "{}", self.as_str()),
        }
    }
}

/// One row of a schedule page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Row `id` attribute, or a synthesized `game_<hash>` when absent.
    pub id: String,
    pub tournament: String,
    /// Calendar day the match was listed under, set by batch extraction.
    pub date: Option<NaiveDate>,
    /// Raw display text (kick-off time).
    pub time: String,
    pub status: MatchStatus,
    pub home_team: String,
    pub away_team: String,
    pub score: String,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,
    /// Absolute URL of the match page.
    pub link: Option<String>,
}

impl Match {
    /// Trailing numeric path segment of `link`, used as the fixture id.
    pub fn ext_id(&self) -> Option<&str> {
        let link = self.link.as_deref()?;
        let path = link.split(['?', '#']).next().unwrap_or(link);
        let last = path.trim_end_matches('/').rsplit('/').next()?;
        (!last.is_empty() && last.chars().all(|c| c.is_ascii_digit())).then_some(last)
    }
}

/// Kind of timeline incident, resolved from the event icon's CSS classes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Goal,
    Substitution,
    YellowCard,
    RedCard,
    SecondYellowCard,
    Unknown,
}

/// Icon class → event type. Checked in order against an icon's class list.
const ICON_CLASSES: &[(&str, EventType)] = &[
    ("incident-14", EventType::Goal),
    ("incident-18", EventType::Substitution),
    ("incident-19", EventType::YellowCard),
    ("incident-20", EventType::RedCard),
    ("incident-21", EventType::SecondYellowCard),
];

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Goal => "goal",
            EventType::Substitution => "substitution",
            EventType::YellowCard => "yellow_card",
            EventType::RedCard => "red_card",
            EventType::SecondYellowCard => "second_yellow_card",
            EventType::Unknown => "unknown",
        }
    }

    /// Resolve the event type from an element's class tokens.
    ///
    /// Returns `None` when no known icon class is present.
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let classes: Vec<&str> = classes.into_iter().collect();
        ICON_CLASSES
            .iter()
            .find(|(class, _)| classes.contains(class))
            .map(|(_, event_type)| *event_type)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

/// One incident on a match timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u32,
    /// Added time, for minutes written as `45+2'`.
    pub stoppage: Option<u32>,
    /// Label of the most recent half separator, or `"unknown"`.
    pub half: String,
    pub event_type: EventType,
    pub team_side: TeamSide,
    pub player_name: String,
    pub assist: Option<String>,
    pub score_after_goal: Option<String>,
    pub player_in: Option<String>,
    pub player_out: Option<String>,
    /// Rendered text of the player cell.
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub shirt_number: String,
    pub photo_url: Option<String>,
    pub event_icons: BTreeSet<EventType>,
    /// Lowercased section label the player was listed under.
    pub position_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    pub coach: String,
    pub starting_lineup: Vec<PlayerEntry>,
    pub substitutes: Vec<PlayerEntry>,
}

impl Lineup {
    pub fn is_empty(&self) -> bool {
        self.coach.is_empty() && self.starting_lineup.is_empty() && self.substitutes.is_empty()
    }
}

/// Both teams' lineups from a lineup page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineups {
    pub home: Lineup,
    pub away: Lineup,
}

/// Timeline and lineups of a single match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub ext_id: String,
    pub events: Vec<MatchEvent>,
    pub home_team: Lineup,
    pub away_team: Lineup,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match(link: Option<&str>) -> Match {
        Match {
            id: "game_1".into(),
            tournament: "Super League".into(),
            date: None,
            time: "20:00".into(),
            status: MatchStatus::Finished,
            home_team: "Alpha FC".into(),
            away_team: "Beta FC".into(),
            score: "2-1".into(),
            home_logo: None,
            away_logo: None,
            link: link.map(String::from),
        }
    }

    #[test]
    fn test_compute_hash_consistency() {
        let h1 = compute_hash("hello world");
        let h2 = compute_hash("hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_event_type_from_classes() {
        assert_eq!(
            EventType::from_classes(["sm-event-icon", "incident-14"]),
            Some(EventType::Goal)
        );
        assert_eq!(
            EventType::from_classes(["incident-21", "sm-event-icon"]),
            Some(EventType::SecondYellowCard)
        );
        assert_eq!(EventType::from_classes(["sm-event-icon"]), None);
        // Whole-token match only.
        assert_eq!(EventType::from_classes(["incident-140"]), None);
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let live = MatchStatus::Live {
            minute: "67'".into(),
        };
        let json = serde_json::to_value(&live).unwrap();
        assert_eq!(json, serde_json::json!({"type": "live", "minute": "67'"}));
        assert_eq!(live.to_string(), "live (67')");
        assert_eq!(MatchStatus::Finished.to_string(), "finished");
    }

    #[test]
    fn test_ext_id_from_link() {
        assert_eq!(
            sample_match(Some("https://championat.asia/oz/game-center/fixture/19438666"))
                .ext_id(),
            Some("19438666")
        );
        assert_eq!(
            sample_match(Some("https://championat.asia/match/5/?tab=1")).ext_id(),
            Some("5")
        );
        assert_eq!(sample_match(Some("https://championat.asia/match/")).ext_id(), None);
        assert_eq!(sample_match(None).ext_id(), None);
    }

    #[test]
    fn test_event_icons_serialize_as_sorted_list() {
        let entry = PlayerEntry {
            name: "Marquinhos".into(),
            event_icons: [EventType::YellowCard, EventType::Goal].into_iter().collect(),
            ..Default::default()
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event_icons"], serde_json::json!(["goal", "yellow_card"]));
    }
}
