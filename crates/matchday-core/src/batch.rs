use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::config::ScraperConfig;
use crate::detail::DetailExtractor;
use crate::dom::Document;
use crate::error::AppError;
use crate::models::{Match, MatchDetail};
use crate::pool::SessionPool;
use crate::schedule::ScheduleExtractor;
use crate::traits::SessionLauncher;
use crate::util::{date_range, parse_date};

/// Events emitted during a batch run.
pub enum BatchEvent<'a> {
    RunStarted {
        run_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        days: usize,
    },
    DayCompleted {
        run_id: Uuid,
        date: NaiveDate,
        matches: usize,
    },
    DayFailed {
        run_id: Uuid,
        date: NaiveDate,
        error: &'a str,
    },
    DetailCompleted {
        run_id: Uuid,
        ext_id: &'a str,
        events: usize,
    },
    DetailFailed {
        run_id: Uuid,
        ext_id: &'a str,
        error: &'a str,
    },
    RunFinished {
        run_id: Uuid,
        matches: usize,
        failed_days: usize,
    },
}

/// Trait for reporting batch progress.
pub trait BatchReporter: Send + Sync {
    fn report(&self, event: BatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBatchReporter;

impl BatchReporter for TracingBatchReporter {
    fn report(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::RunStarted {
                run_id,
                start,
                end,
                days,
            } => {
                tracing::info!(%run_id, %start, %end, days, "Batch started");
            }
            BatchEvent::DayCompleted {
                run_id,
                date,
                matches,
            } => {
                tracing::info!(%run_id, %date, matches, "Day extracted");
            }
            BatchEvent::DayFailed {
                run_id,
                date,
                error,
            } => {
                tracing::warn!(%run_id, %date, %error, "Day failed, contributing no matches");
            }
            BatchEvent::DetailCompleted {
                run_id,
                ext_id,
                events,
            } => {
                tracing::info!(%run_id, %ext_id, events, "Match detail extracted");
            }
            BatchEvent::DetailFailed {
                run_id,
                ext_id,
                error,
            } => {
                tracing::warn!(%run_id, %ext_id, %error, "Match detail failed");
            }
            BatchEvent::RunFinished {
                run_id,
                matches,
                failed_days,
            } => {
                tracing::info!(%run_id, matches, failed_days, "Batch finished");
            }
        }
    }
}

/// Drives schedule and detail extraction over a shared session pool.
///
/// Up to `pool_capacity` pages are in flight at once; results always come
/// back in input order.
pub struct BatchOrchestrator<L: SessionLauncher> {
    pool: Arc<SessionPool<L>>,
    config: ScraperConfig,
    schedule: ScheduleExtractor,
    detail: DetailExtractor,
}

impl<L: SessionLauncher> BatchOrchestrator<L> {
    pub fn new(pool: Arc<SessionPool<L>>, config: ScraperConfig) -> Result<Self, AppError> {
        Ok(Self {
            schedule: ScheduleExtractor::new(&config)?,
            detail: DetailExtractor::new(&config)?,
            pool,
            config,
        })
    }

    pub fn pool(&self) -> &Arc<SessionPool<L>> {
        &self.pool
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Matches listed on one calendar day, each stamped with `date`.
    pub async fn extract_day(&self, date: NaiveDate) -> Result<Vec<Match>, AppError> {
        let url = self.config.schedule_url(date);
        let lease = self.pool.lease().await?;
        let page = lease.fetch(&url, &self.config.markers.schedule_ready).await;
        lease.release().await;

        let mut matches = self.schedule_from_html(&page?);
        for m in &mut matches {
            m.date = Some(date);
        }
        tracing::debug!(%date, matches = matches.len(), "Schedule page parsed");
        Ok(matches)
    }

    fn schedule_from_html(&self, html: &str) -> Vec<Match> {
        self.schedule.extract(&Document::parse(html))
    }

    /// Matches of every day from `start` to `end` inclusive, in day order.
    ///
    /// A day that fails to load is reported and contributes nothing; only an
    /// inverted range is an error.
    pub async fn extract_range<R: BatchReporter>(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        reporter: &R,
    ) -> Result<Vec<Match>, AppError> {
        if start > end {
            return Err(AppError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let run_id = Uuid::new_v4();
        let days: Vec<NaiveDate> = date_range(start, end).collect();
        reporter.report(BatchEvent::RunStarted {
            run_id,
            start,
            end,
            days: days.len(),
        });

        let per_day: Vec<Option<Vec<Match>>> = stream::iter(days)
            .map(|date| async move {
                match self.extract_day(date).await {
                    Ok(matches) => {
                        reporter.report(BatchEvent::DayCompleted {
                            run_id,
                            date,
                            matches: matches.len(),
                        });
                        Some(matches)
                    }
                    Err(e) => {
                        reporter.report(BatchEvent::DayFailed {
                            run_id,
                            date,
                            error: &e.to_string(),
                        });
                        None
                    }
                }
            })
            .buffered(self.pool.capacity())
            .collect()
            .await;

        let failed_days = per_day.iter().filter(|day| day.is_none()).count();
        let matches: Vec<Match> = per_day.into_iter().flatten().flatten().collect();

        reporter.report(BatchEvent::RunFinished {
            run_id,
            matches: matches.len(),
            failed_days,
        });
        Ok(matches)
    }

    /// [`extract_range`](Self::extract_range) over dates in the configured
    /// input format (`%d/%m/%Y` by default).
    pub async fn extract_range_str<R: BatchReporter>(
        &self,
        start: &str,
        end: &str,
        reporter: &R,
    ) -> Result<Vec<Match>, AppError> {
        let start = parse_date(start, &self.config.date_format)?;
        let end = parse_date(end, &self.config.date_format)?;
        self.extract_range(start, end, reporter).await
    }

    /// Timeline and lineups of one match.
    pub async fn extract_detail(&self, ext_id: &str) -> Result<MatchDetail, AppError> {
        self.detail.fetch_detail(&self.pool, ext_id).await
    }

    /// Details of many matches, in the order of `ext_ids`. A match whose
    /// session could not be leased comes back empty.
    pub async fn extract_details<R: BatchReporter>(
        &self,
        ext_ids: &[String],
        reporter: &R,
    ) -> Vec<MatchDetail> {
        let run_id = Uuid::new_v4();

        stream::iter(ext_ids)
            .map(|ext_id| async move {
                match self.extract_detail(ext_id).await {
                    Ok(detail) => {
                        reporter.report(BatchEvent::DetailCompleted {
                            run_id,
                            ext_id,
                            events: detail.events.len(),
                        });
                        detail
                    }
                    Err(e) => {
                        reporter.report(BatchEvent::DetailFailed {
                            run_id,
                            ext_id,
                            error: &e.to_string(),
                        });
                        MatchDetail {
                            ext_id: ext_id.clone(),
                            ..Default::default()
                        }
                    }
                }
            })
            .buffered(self.pool.capacity())
            .collect()
            .await
    }
}
