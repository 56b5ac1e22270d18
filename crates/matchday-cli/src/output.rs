use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use matchday_core::models::{Match, MatchDetail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON array
    Json,
    /// One CSV row per match (or per event, for details)
    Csv,
}

/// Flat CSV view of a [`Match`].
#[derive(Serialize)]
struct MatchRow<'a> {
    id: &'a str,
    date: Option<String>,
    tournament: &'a str,
    time: &'a str,
    status: &'static str,
    status_detail: Option<&'a str>,
    home_team: &'a str,
    score: &'a str,
    away_team: &'a str,
    home_logo: Option<&'a str>,
    away_logo: Option<&'a str>,
    link: Option<&'a str>,
}

impl<'a> From<&'a Match> for MatchRow<'a> {
    fn from(m: &'a Match) -> Self {
        Self {
            id: &m.id,
            date: m.date.map(|d| d.format("%Y-%m-%d").to_string()),
            tournament: &m.tournament,
            time: &m.time,
            status: m.status.as_str(),
            status_detail: m.status.detail(),
            home_team: &m.home_team,
            score: &m.score,
            away_team: &m.away_team,
            home_logo: m.home_logo.as_deref(),
            away_logo: m.away_logo.as_deref(),
            link: m.link.as_deref(),
        }
    }
}

/// Flat CSV view of one timeline event.
#[derive(Serialize)]
struct EventRow<'a> {
    ext_id: &'a str,
    minute: u32,
    stoppage: Option<u32>,
    half: &'a str,
    event_type: &'static str,
    team_side: &'static str,
    player_name: &'a str,
    assist: Option<&'a str>,
    score_after_goal: Option<&'a str>,
    player_in: Option<&'a str>,
    player_out: Option<&'a str>,
}

pub fn write_matches<W: Write>(mut out: W, matches: &[Match], format: Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, matches).context("Failed to write JSON")?;
            writeln!(out)?;
            out.flush()?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for m in matches {
                writer
                    .serialize(MatchRow::from(m))
                    .context("Failed to write CSV row")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

pub fn write_details<W: Write>(
    mut out: W,
    details: &[MatchDetail],
    format: Format,
) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, details).context("Failed to write JSON")?;
            writeln!(out)?;
            out.flush()?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for detail in details {
                for event in &detail.events {
                    writer
                        .serialize(EventRow {
                            ext_id: &detail.ext_id,
                            minute: event.minute,
                            stoppage: event.stoppage,
                            half: &event.half,
                            event_type: event.event_type.as_str(),
                            team_side: event.team_side.as_str(),
                            player_name: &event.player_name,
                            assist: event.assist.as_deref(),
                            score_after_goal: event.score_after_goal.as_deref(),
                            player_in: event.player_in.as_deref(),
                            player_out: event.player_out.as_deref(),
                        })
                        .context("Failed to write CSV row")?;
                }
            }
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use matchday_core::models::{EventType, MatchEvent, MatchStatus, TeamSide};

    use super::*;

    fn sample() -> Match {
        Match {
            id: "m5".into(),
            tournament: "Super League".into(),
            date: NaiveDate::from_ymd_opt(2025, 7, 15),
            time: "20:00".into(),
            status: MatchStatus::Live {
                minute: "67'".into(),
            },
            home_team: "Alpha FC".into(),
            away_team: "Beta FC".into(),
            score: "2-1".into(),
            home_logo: None,
            away_logo: None,
            link: Some("https://championat.asia/match/5".into()),
        }
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_match() {
        let mut buf = Vec::new();
        write_matches(&mut buf, &[sample(), sample()], Format::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,date,tournament,time,status,status_detail"));
        assert_eq!(
            lines[1],
            "m5,2025-07-15,Super League,20:00,live,67',Alpha FC,2-1,Beta FC,,,https://championat.asia/match/5"
        );
    }

    #[test]
    fn test_json_round_trips_matches() {
        let mut buf = Vec::new();
        write_matches(&mut buf, &[sample()], Format::Json).unwrap();
        let parsed: Vec<Match> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, vec![sample()]);
    }

    #[test]
    fn test_detail_csv_flattens_events() {
        let detail = MatchDetail {
            ext_id: "19438666".into(),
            events: vec![MatchEvent {
                minute: 23,
                stoppage: None,
                half: "1-bo'lim".into(),
                event_type: EventType::Goal,
                team_side: TeamSide::Home,
                player_name: "Marquinhos".into(),
                assist: Some("Nail Umyarov".into()),
                score_after_goal: Some("1-0".into()),
                player_in: None,
                player_out: None,
                details: "Marquinhos 1-0\n(Nail Umyarov)".into(),
            }],
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_details(&mut buf, &[detail], Format::Csv).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, "19438666,23,,1-bo'lim,goal,home,Marquinhos,Nail Umyarov,1-0,,");
    }
}
