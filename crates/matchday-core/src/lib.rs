pub mod batch;
pub mod config;
pub mod detail;
pub mod dom;
pub mod error;
pub mod models;
pub mod pool;
pub mod schedule;
pub mod session;
pub mod traits;
pub mod util;

#[cfg(test)]
mod testutil;

pub use batch::{BatchEvent, BatchOrchestrator, BatchReporter, TracingBatchReporter};
pub use config::{ScraperConfig, SiteMarkers};
pub use detail::DetailExtractor;
pub use error::AppError;
pub use models::{
    EventType, Lineup, Lineups, Match, MatchDetail, MatchEvent, MatchStatus, PlayerEntry,
    TeamSide, compute_hash,
};
pub use pool::{PoolStats, SessionPool};
pub use schedule::ScheduleExtractor;
pub use session::{ScrapeSession, SessionTimeouts};
pub use traits::{BrowserSession, SessionLauncher};
