use url::Url;

use crate::config::{ScraperConfig, SiteMarkers};
use crate::dom::{Document, Node, Selector, compile};
use crate::error::AppError;
use crate::models::{Match, MatchStatus, compute_hash};
use crate::util::absolutize;

/// Label for tables that have no matching tournament header.
pub const UNKNOWN_TOURNAMENT: &str = "Unknown";

/// Minimum cells of a match row: time through away team.
const MIN_CELLS: usize = 7;

const COL_TIME: usize = 0;
const COL_STATUS: usize = 1;
const COL_HOME: usize = 2;
const COL_HOME_LOGO: usize = 3;
const COL_SCORE: usize = 4;
const COL_AWAY_LOGO: usize = 5;
const COL_AWAY: usize = 6;
const COL_LINK: usize = 7;

/// Turns a rendered schedule page into [`Match`] records.
pub struct ScheduleExtractor {
    base_url: Url,
    status_finished: String,
    status_cancelled: String,
    status_live: String,
    tournament: Selector,
    table: Selector,
    row: Selector,
    cell: Selector,
    img: Selector,
    anchor: Selector,
}

impl ScheduleExtractor {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let SiteMarkers {
            tournament_name,
            schedule_table,
            status_finished,
            status_cancelled,
            status_live,
            ..
        } = &config.markers;

        Ok(Self {
            base_url: config.base_url.clone(),
            status_finished: status_finished.clone(),
            status_cancelled: status_cancelled.clone(),
            status_live: strip_spaces(status_live),
            tournament: compile(tournament_name)?,
            table: compile(schedule_table)?,
            row: compile("tr")?,
            cell: compile("td")?,
            img: compile("img")?,
            anchor: compile("a")?,
        })
    }

    /// Every match on the page, in document order.
    ///
    /// The i-th schedule table belongs to the i-th tournament header; tables
    /// past the last header are labelled [`UNKNOWN_TOURNAMENT`]. Rows with
    /// too few cells are skipped.
    pub fn extract(&self, doc: &Document) -> Vec<Match> {
        let tournaments: Vec<String> = doc
            .select(&self.tournament)
            .iter()
            .map(Node::text)
            .collect();
        let tables = doc.select(&self.table);

        if tournaments.len() != tables.len() {
            tracing::warn!(
                tournaments = tournaments.len(),
                tables = tables.len(),
                "Tournament headers and schedule tables differ in count"
            );
        }

        let mut matches = Vec::new();
        for (i, table) in tables.iter().enumerate() {
            let tournament = tournaments
                .get(i)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_TOURNAMENT);

            for row in table.select(&self.row) {
                match self.parse_row(row, tournament) {
                    Ok(m) => matches.push(m),
                    Err(e) => tracing::trace!(error = %e, "Skipping schedule row"),
                }
            }
        }

        tracing::debug!(matches = matches.len(), tables = tables.len(), "Parsed schedule page");
        matches
    }

    fn parse_row(&self, row: Node<'_>, tournament: &str) -> Result<Match, AppError> {
        let cells = row.select(&self.cell);
        if cells.len() < MIN_CELLS {
            return Err(AppError::RowParse(format!(
                "expected at least {MIN_CELLS} cells, found {}",
                cells.len()
            )));
        }

        let time = cells[COL_TIME].text();
        let home_team = cells[COL_HOME].text();
        let away_team = cells[COL_AWAY].text();

        let id = match row.attr("id").map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => synthesize_id(tournament, &time, &home_team, &away_team),
        };

        Ok(Match {
            id,
            tournament: tournament.to_string(),
            date: None,
            status: self.classify_status(cells[COL_STATUS]),
            score: cells[COL_SCORE].text(),
            home_logo: self.logo(cells[COL_HOME_LOGO]),
            away_logo: self.logo(cells[COL_AWAY_LOGO]),
            link: cells.get(COL_LINK).and_then(|cell| self.link(*cell)),
            time,
            home_team,
            away_team,
        })
    }

    /// Classify a status cell. Markers are checked in priority order:
    /// finished, cancelled, live (red inline style), else not started. An
    /// empty cell is an upcoming fixture.
    pub fn classify_status(&self, cell: Node<'_>) -> MatchStatus {
        let markup = cell.inner_html();
        if markup.contains(&self.status_finished) {
            MatchStatus::Finished
        } else if markup.contains(&self.status_cancelled) {
            MatchStatus::Cancelled
        } else if strip_spaces(&markup).contains(&self.status_live) {
            MatchStatus::Live {
                minute: cell.text(),
            }
        } else {
            MatchStatus::NotStarted
        }
    }

    fn logo(&self, cell: Node<'_>) -> Option<String> {
        let src = cell.first(&self.img)?.attr("src")?.trim();
        (src.starts_with("http://") || src.starts_with("https://")).then(|| src.to_string())
    }

    fn link(&self, cell: Node<'_>) -> Option<String> {
        let href = cell.first(&self.anchor)?.attr("href")?;
        absolutize(&self.base_url, href)
    }
}

fn strip_spaces(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Stable id for rows the page did not label.
fn synthesize_id(tournament: &str, time: &str, home: &str, away: &str) -> String {
    let hash = compute_hash(&format!("{tournament}|{time}|{home}|{away}"));
    format!("game_{}", &hash[..12])
}
