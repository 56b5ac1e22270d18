use std::time::Duration;

use chrono::NaiveDate;
use url::Url;

use crate::error::AppError;

/// Site vocabulary: selectors and marker strings the extractors look for.
#[derive(Debug, Clone)]
pub struct SiteMarkers {
    /// Anchor that signals a rendered schedule page.
    pub schedule_ready: String,
    pub tournament_name: String,
    pub schedule_table: String,
    pub status_finished: String,
    pub status_cancelled: String,
    /// Inline-style fragment marking a live match (compared without spaces).
    pub status_live: String,

    /// Anchor that signals a rendered event timeline.
    pub events_ready: String,
    pub events_table: String,
    pub half_separator: String,
    /// Class carried by the minute cell of an event row.
    pub minute_marker: String,
    pub event_icon: String,
    pub goal_score: String,
    /// Parenthetical element holding an assist or an outgoing player.
    pub parenthetical: String,

    /// Anchor that signals a rendered lineup page.
    pub lineups_ready: String,
    pub lineup_section: String,
    pub lineup_separator: String,
    pub lineup_table: String,
    pub shirt_number: String,
    /// Lowercased section label naming the coach.
    pub coach_label: String,
    /// Substring of a lowercased section label naming the substitutes.
    pub substitutes_label: String,
}

impl Default for SiteMarkers {
    fn default() -> Self {
        Self {
            schedule_ready: ".match-center-list".into(),
            tournament_name: ".tourney-name".into(),
            schedule_table: "table.games-table".into(),
            status_finished: "matchcenter-sprite-finished".into(),
            status_cancelled: "matchcenter-sprite-cancelled".into(),
            status_live: "color:red".into(),

            events_ready: ".game-incident-list".into(),
            events_table: ".game-incident-list .incidents-table".into(),
            half_separator: ".table-separator".into(),
            minute_marker: "green".into(),
            event_icon: ".sm-event-icon".into(),
            goal_score: ".score".into(),
            parenthetical: ".gray".into(),

            lineups_ready: ".lineup-layout".into(),
            lineup_section: ".lineup-layout .lineup".into(),
            lineup_separator: ".lineup-separator".into(),
            lineup_table: ".lineup-table".into(),
            shirt_number: ".rank".into(),
            coach_label: "murabbiy".into(),
            substitutes_label: "zaxira".into(),
        }
    }
}

/// Configuration for the scraping pipeline.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Maximum number of live browser sessions.
    pub pool_capacity: usize,
    /// Hard bound on a single page load.
    pub page_load_timeout: Duration,
    /// Bound on waiting for the ready anchor after the page has loaded.
    pub ready_timeout: Duration,
    /// How long a blocking lease waits for a session to be released.
    pub lease_timeout: Duration,
    /// Interval between DOM polls while waiting for the ready anchor.
    pub poll_interval: Duration,
    /// Site origin; relative links are resolved against it.
    pub base_url: Url,
    /// Language segment of the site's paths (e.g. `oz`).
    pub locale: String,
    /// Value of the calendar's `sort` query parameter.
    pub sort: String,
    /// `chrono` format of the dates accepted from callers.
    pub date_format: String,
    pub markers: SiteMarkers,
}

pub const DEFAULT_BASE_URL: &str = "https://championat.asia";

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 2,
            page_load_timeout: Duration::from_secs(15),
            ready_timeout: Duration::from_secs(8),
            lease_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!()),
            locale: "oz".into(),
            sort: "any".into(),
            date_format: "%d/%m/%Y".into(),
            markers: SiteMarkers::default(),
        }
    }
}

impl ScraperConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `MATCHDAY_POOL_SIZE` (at least 1)
    /// - `MATCHDAY_PAGE_TIMEOUT_SECS`
    /// - `MATCHDAY_READY_TIMEOUT_SECS`
    /// - `MATCHDAY_LEASE_TIMEOUT_SECS`
    /// - `MATCHDAY_BASE_URL`
    /// - `MATCHDAY_LOCALE`
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(size) = env_number("MATCHDAY_POOL_SIZE")? {
            config = config.with_pool_capacity(size as usize)?;
        }
        if let Some(secs) = env_number("MATCHDAY_PAGE_TIMEOUT_SECS")? {
            config.page_load_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("MATCHDAY_READY_TIMEOUT_SECS")? {
            config.ready_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("MATCHDAY_LEASE_TIMEOUT_SECS")? {
            config.lease_timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var("MATCHDAY_BASE_URL") {
            config = config.with_base_url(&raw)?;
        }
        if let Ok(locale) = std::env::var("MATCHDAY_LOCALE") {
            config.locale = locale;
        }

        Ok(config)
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Result<Self, AppError> {
        if capacity == 0 {
            return Err(AppError::Config("pool capacity must be at least 1".into()));
        }
        self.pool_capacity = capacity;
        Ok(self)
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self, AppError> {
        let url = Url::parse(raw)
            .map_err(|e| AppError::Config(format!("Invalid base URL '{raw}': {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AppError::Config(format!(
                    "Base URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn with_timeouts(mut self, page_load: Duration, ready: Duration) -> Self {
        self.page_load_timeout = page_load;
        self.ready_timeout = ready;
        self
    }

    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Site origin without a trailing slash.
    fn origin(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Calendar page listing every match of `date`.
    pub fn schedule_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}/game-center/calendar?sort={}&date={}",
            self.origin(),
            self.locale,
            self.sort,
            date.format("%Y-%m-%d")
        )
    }

    /// Fixture page carrying the event timeline.
    pub fn events_url(&self, ext_id: &str) -> String {
        format!("{}/{}/game-center/fixture/{ext_id}", self.origin(), self.locale)
    }

    /// Fragment page carrying both lineups.
    pub fn lineups_url(&self, ext_id: &str) -> String {
        format!(
            "{}/{}/game-center/fixture/lineup/load/{ext_id}",
            self.origin(),
            self.locale
        )
    }
}

fn env_number(key: &str) -> Result<Option<u64>, AppError> {
    match std::env::var(key) {
        Err(_) => Ok(None),
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::Config(format!("Invalid {key} '{raw}': must be a non-negative integer"))
        }),
    }
}
