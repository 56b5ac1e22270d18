//! Match timeline and lineup extraction.
//!
//! A timeline table interleaves half separators with event rows of five
//! cells: home player, home icon, minute, away icon, away player. Each side
//! of a row is inspected on its own, so one row yields up to two events.
//!
//! Lineup pages hold one `.lineup` section per team; inside a section, the
//! j-th position table is labelled by the j-th separator.

use std::sync::Arc;

use url::Url;

use crate::config::ScraperConfig;
use crate::dom::{Document, Node, Selector, compile};
use crate::error::AppError;
use crate::models::{EventType, Lineup, Lineups, MatchDetail, MatchEvent, PlayerEntry, TeamSide};
use crate::pool::SessionPool;
use crate::traits::SessionLauncher;
use crate::util::{absolutize, parse_minute, split_score_suffix, strip_parens};

/// Half label used until the first separator row.
pub const UNKNOWN_HALF: &str = "unknown";

/// Section label for lineup tables past the last separator.
pub const UNKNOWN_SECTION: &str = "unknown";

const EVENT_MIN_CELLS: usize = 5;
const LINEUP_MIN_CELLS: usize = 3;

const COL_HOME_PLAYER: usize = 0;
const COL_HOME_ICON: usize = 1;
const COL_MINUTE: usize = 2;
const COL_AWAY_ICON: usize = 3;
const COL_AWAY_PLAYER: usize = 4;

const COL_LINEUP_NAME: usize = 2;

pub struct DetailExtractor {
    config: ScraperConfig,
    minute_marker: String,
    coach_label: String,
    substitutes_label: String,
    events_table: Selector,
    half_separator: Selector,
    event_icon: Selector,
    goal_score: Selector,
    parenthetical: Selector,
    lineup_section: Selector,
    lineup_separator: Selector,
    lineup_table: Selector,
    shirt_number: Selector,
    row: Selector,
    cell: Selector,
    img: Selector,
}

impl DetailExtractor {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let markers = &config.markers;
        Ok(Self {
            minute_marker: markers.minute_marker.clone(),
            coach_label: markers.coach_label.to_lowercase(),
            substitutes_label: markers.substitutes_label.to_lowercase(),
            events_table: compile(&markers.events_table)?,
            half_separator: compile(&markers.half_separator)?,
            event_icon: compile(&markers.event_icon)?,
            goal_score: compile(&markers.goal_score)?,
            parenthetical: compile(&markers.parenthetical)?,
            lineup_section: compile(&markers.lineup_section)?,
            lineup_separator: compile(&markers.lineup_separator)?,
            lineup_table: compile(&markers.lineup_table)?,
            shirt_number: compile(&markers.shirt_number)?,
            row: compile("tr")?,
            cell: compile("td")?,
            img: compile("img")?,
            config: config.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Timeline
    // -----------------------------------------------------------------------

    /// Every event on the timeline, top to bottom.
    pub fn extract_events(&self, doc: &Document) -> Vec<MatchEvent> {
        let Some(table) = doc.first(&self.events_table) else {
            tracing::debug!("No incidents table on page");
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut current_half = UNKNOWN_HALF.to_string();

        for row in table.select(&self.row) {
            if let Some(separator) = row.first(&self.half_separator) {
                current_half = separator.text();
                continue;
            }
            match self.parse_event_row(row, &current_half) {
                Ok(row_events) => events.extend(row_events),
                Err(e) => tracing::trace!(error = %e, "Skipping timeline row"),
            }
        }

        events
    }

    fn parse_event_row(&self, row: Node<'_>, half: &str) -> Result<Vec<MatchEvent>, AppError> {
        let cells = row.select(&self.cell);
        if cells.len() < EVENT_MIN_CELLS {
            return Err(AppError::RowParse(format!(
                "expected at least {EVENT_MIN_CELLS} cells, found {}",
                cells.len()
            )));
        }

        let minute_cell = cells[COL_MINUTE];
        let marked = minute_cell
            .attr("class")
            .is_some_and(|class| class.contains(&self.minute_marker));
        if !marked {
            return Err(AppError::RowParse("minute cell lacks the minute marker".into()));
        }
        let raw_minute = minute_cell.text();
        let (minute, stoppage) = parse_minute(&raw_minute)
            .ok_or_else(|| AppError::RowParse(format!("unreadable minute '{raw_minute}'")))?;
        let moment = Moment {
            minute,
            stoppage,
            half,
        };

        let sides = [
            (TeamSide::Home, cells[COL_HOME_PLAYER], cells[COL_HOME_ICON]),
            (TeamSide::Away, cells[COL_AWAY_PLAYER], cells[COL_AWAY_ICON]),
        ];

        Ok(sides
            .into_iter()
            .filter_map(|(side, player_cell, icon_cell)| {
                let details = player_cell.text();
                if details.is_empty() {
                    return None;
                }
                let icon = icon_cell.first(&self.event_icon)?;
                let event_type =
                    EventType::from_classes(icon.classes()).unwrap_or(EventType::Unknown);
                Some(self.build_event(player_cell, details, event_type, side, &moment))
            })
            .collect())
    }

    fn build_event(
        &self,
        cell: Node<'_>,
        details: String,
        event_type: EventType,
        team_side: TeamSide,
        moment: &Moment<'_>,
    ) -> MatchEvent {
        let parenthetical = cell
            .first(&self.parenthetical)
            .map(|node| node.text())
            .filter(|text| !text.is_empty());
        let lead = lead_line(&details, parenthetical.as_deref());

        let mut event = MatchEvent {
            minute: moment.minute,
            stoppage: moment.stoppage,
            half: moment.half.to_string(),
            event_type,
            team_side,
            player_name: lead.clone(),
            assist: None,
            score_after_goal: None,
            player_in: None,
            player_out: None,
            details: String::new(),
        };

        match event_type {
            EventType::Goal => {
                let (name, suffix) = split_score_suffix(&lead);
                event.player_name = name.to_string();
                event.score_after_goal = cell
                    .first(&self.goal_score)
                    .map(|node| node.text())
                    .filter(|score| !score.is_empty())
                    .or_else(|| suffix.map(String::from));
                event.assist = parenthetical
                    .as_deref()
                    .map(strip_parens)
                    .filter(|a| !a.is_empty());
            }
            EventType::Substitution => {
                event.player_in = Some(lead);
                event.player_out = parenthetical
                    .as_deref()
                    .map(strip_parens)
                    .filter(|p| !p.is_empty());
            }
            _ => {}
        }

        event.details = details;
        event
    }

    // -----------------------------------------------------------------------
    // Lineups
    // -----------------------------------------------------------------------

    /// Home and away lineups. A missing team section yields an empty lineup.
    pub fn extract_lineups(&self, doc: &Document) -> Lineups {
        let sections = doc.select(&self.lineup_section);
        if sections.len() != 2 {
            tracing::debug!(sections = sections.len(), "Expected two lineup sections");
        }

        let mut teams = sections.into_iter().take(2).map(|section| self.parse_lineup(section));
        Lineups {
            home: teams.next().unwrap_or_default(),
            away: teams.next().unwrap_or_default(),
        }
    }

    fn parse_lineup(&self, section: Node<'_>) -> Lineup {
        let labels: Vec<String> = section
            .select(&self.lineup_separator)
            .iter()
            .map(|node| node.text().to_lowercase())
            .collect();
        let tables = section.select(&self.lineup_table);

        if labels.len() != tables.len() {
            tracing::warn!(
                separators = labels.len(),
                tables = tables.len(),
                "Lineup separators and tables differ in count"
            );
        }

        let mut lineup = Lineup::default();
        for (j, table) in tables.iter().enumerate() {
            let group = labels.get(j).map(String::as_str).unwrap_or(UNKNOWN_SECTION);

            for row in table.select(&self.row) {
                let Some(player) = self.parse_player(row, group) else {
                    continue;
                };
                if group == self.coach_label {
                    lineup.coach = player.name;
                } else if group.contains(&self.substitutes_label) {
                    lineup.substitutes.push(player);
                } else {
                    lineup.starting_lineup.push(player);
                }
            }
        }
        lineup
    }

    fn parse_player(&self, row: Node<'_>, group: &str) -> Option<PlayerEntry> {
        let cells = row.select(&self.cell);
        if cells.len() < LINEUP_MIN_CELLS {
            return None;
        }
        let name = cells[COL_LINEUP_NAME].text();
        if name.is_empty() {
            return None;
        }

        Some(PlayerEntry {
            name,
            shirt_number: row
                .first(&self.shirt_number)
                .map(|node| node.text())
                .unwrap_or_default(),
            photo_url: row
                .first(&self.img)
                .and_then(|img| img.attr("src"))
                .and_then(|src| absolutize(self.base_url(), src)),
            event_icons: row
                .select(&self.event_icon)
                .iter()
                .filter_map(|icon| EventType::from_classes(icon.classes()))
                .collect(),
            position_group: group.to_string(),
        })
    }

    fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    // -----------------------------------------------------------------------
    // Fetching
    // -----------------------------------------------------------------------

    /// Load the timeline and lineup pages of one match with a single leased
    /// session. A page that fails to load contributes an empty part; only a
    /// failed lease is an error.
    pub async fn fetch_detail<L: SessionLauncher>(
        &self,
        pool: &Arc<SessionPool<L>>,
        ext_id: &str,
    ) -> Result<MatchDetail, AppError> {
        let lease = pool.lease().await?;
        let markers = &self.config.markers;

        let events_url = self.config.events_url(ext_id);
        let events = match lease.fetch(&events_url, &markers.events_ready).await {
            Ok(html) => self.events_from_html(&html),
            Err(e) => {
                tracing::warn!(%ext_id, url = %events_url, error = %e, "Timeline unavailable");
                Vec::new()
            }
        };

        let lineups_url = self.config.lineups_url(ext_id);
        let lineups = match lease.fetch(&lineups_url, &markers.lineups_ready).await {
            Ok(html) => self.lineups_from_html(&html),
            Err(e) => {
                tracing::warn!(%ext_id, url = %lineups_url, error = %e, "Lineups unavailable");
                Lineups::default()
            }
        };

        lease.release().await;

        tracing::debug!(%ext_id, events = events.len(), "Parsed match detail");
        Ok(MatchDetail {
            ext_id: ext_id.to_string(),
            events,
            home_team: lineups.home,
            away_team: lineups.away,
        })
    }

    fn events_from_html(&self, html: &str) -> Vec<MatchEvent> {
        self.extract_events(&Document::parse(html))
    }

    fn lineups_from_html(&self, html: &str) -> Lineups {
        self.extract_lineups(&Document::parse(html))
    }
}

/// When a timeline row happened.
struct Moment<'a> {
    minute: u32,
    stoppage: Option<u32>,
    half: &'a str,
}

/// First rendered line of a player cell, with an inline parenthetical removed.
fn lead_line(details: &str, parenthetical: Option<&str>) -> String {
    let first = details.lines().next().unwrap_or_default();
    match parenthetical {
        Some(p) if first.contains(p) => first.replacen(p, "", 1).trim().to_string(),
        _ => first.trim().to_string(),
    }
}
