use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OwnedSemaphorePermit;

use crate::config::ScraperConfig;
use crate::error::AppError;
use crate::pool::SessionPool;
use crate::traits::{BrowserSession, SessionLauncher};

/// Time bounds applied to every navigation.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub page_load: Duration,
    pub ready: Duration,
    pub poll_interval: Duration,
}

impl From<&ScraperConfig> for SessionTimeouts {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            page_load: config.page_load_timeout,
            ready: config.ready_timeout,
            poll_interval: config.poll_interval,
        }
    }
}

enum Origin<L: SessionLauncher> {
    Pooled {
        pool: Arc<SessionPool<L>>,
        // Released after the session is back in the idle set.
        _permit: OwnedSemaphorePermit,
    },
    Overflow,
}

/// A scoped lease of one browser session.
///
/// Dropping the lease hands a pooled session back to its pool, or closes an
/// overflow session in the background. [`release`](Self::release) does the
/// same explicitly and, for overflow sessions, waits for the close.
pub struct ScrapeSession<L: SessionLauncher> {
    session: Option<Arc<L::Session>>,
    origin: Origin<L>,
    timeouts: SessionTimeouts,
}

impl<L: SessionLauncher> std::fmt::Debug for ScrapeSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeSession")
            .field("overflow", &self.is_overflow())
            .finish_non_exhaustive()
    }
}

impl<L: SessionLauncher> ScrapeSession<L> {
    pub(crate) fn pooled(
        pool: Arc<SessionPool<L>>,
        session: Arc<L::Session>,
        permit: OwnedSemaphorePermit,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            session: Some(session),
            origin: Origin::Pooled {
                pool,
                _permit: permit,
            },
            timeouts,
        }
    }

    pub(crate) fn overflow(session: Arc<L::Session>, timeouts: SessionTimeouts) -> Self {
        Self {
            session: Some(session),
            origin: Origin::Overflow,
            timeouts,
        }
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self.origin, Origin::Overflow)
    }

    /// The leased engine handle.
    pub fn browser(&self) -> &L::Session {
        match &self.session {
            Some(session) => session,
            None => unreachable!("session is only taken on release"),
        }
    }

    /// Load `url`, then wait for `ready_selector` to appear.
    ///
    /// The load is bounded by the page-load timeout
    /// ([`AppError::NavigationTimeout`]); the wait by the shorter ready
    /// timeout ([`AppError::ElementNotFound`]).
    pub async fn navigate(&self, url: &str, ready_selector: &str) -> Result<(), AppError> {
        let page_load = self.timeouts.page_load;
        match tokio::time::timeout(page_load, self.browser().goto(url)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(%url, timeout_secs = page_load.as_secs(), "Page load timed out");
                return Err(AppError::NavigationTimeout {
                    url: url.to_string(),
                    secs: page_load.as_secs(),
                });
            }
        }

        self.wait_for(ready_selector, self.timeouts.ready).await
    }

    /// Poll the DOM until `selector` matches, for at most `timeout`.
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), AppError> {
        let poll = async {
            loop {
                if self.browser().has_element(selector).await? {
                    return Ok::<(), AppError>(());
                }
                tokio::time::sleep(self.timeouts.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%selector, "Ready anchor did not appear");
                Err(AppError::ElementNotFound {
                    selector: selector.to_string(),
                })
            }
        }
    }

    /// The current DOM serialized as HTML.
    pub async fn page_html(&self) -> Result<String, AppError> {
        self.browser().content().await
    }

    /// Navigate and hand back the rendered HTML once `ready_selector` is present.
    pub async fn fetch(&self, url: &str, ready_selector: &str) -> Result<String, AppError> {
        self.navigate(url, ready_selector).await?;
        self.page_html().await
    }

    /// End the scope now: return a pooled session, or close an overflow one.
    pub async fn release(mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match &self.origin {
            Origin::Pooled { pool, .. } => pool.release(session),
            Origin::Overflow => {
                if let Err(e) = session.close().await {
                    tracing::warn!(error = %e, "Failed to close overflow session");
                }
            }
        }
    }
}

impl<L: SessionLauncher> Drop for ScrapeSession<L> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match &self.origin {
            Origin::Pooled { pool, .. } => pool.release(session),
            Origin::Overflow => close_detached(session),
        }
    }
}

fn close_detached<S: BrowserSession>(session: Arc<S>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = session.close().await {
                    tracing::warn!(error = %e, "Failed to close overflow session");
                }
            });
        }
        Err(_) => tracing::warn!("No async runtime available to close overflow session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn pool(launcher: &MockLauncher) -> Arc<SessionPool<MockLauncher>> {
        let config = ScraperConfig::default().with_timeouts(
            Duration::from_secs(15),
            Duration::from_secs(8),
        );
        SessionPool::new(launcher.clone(), &config)
    }

    #[tokio::test]
    async fn test_navigate_succeeds_when_anchor_present() {
        let launcher = MockLauncher::new();
        launcher.route("https://site/a", r#"<div class="ready">ok</div>"#);
        let pool = pool(&launcher);

        let lease = pool.lease().await.unwrap();
        lease.navigate("https://site/a", ".ready").await.unwrap();
        assert!(lease.page_html().await.unwrap().contains("ok"));
        assert_eq!(launcher.visited(), vec!["https://site/a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_times_out_on_slow_load() {
        let launcher = MockLauncher::new();
        launcher.route_hanging("https://site/slow");
        let pool = pool(&launcher);

        let lease = pool.lease().await.unwrap();
        let err = lease.navigate("https://site/slow", ".ready").await.unwrap_err();
        assert!(matches!(err, AppError::NavigationTimeout { secs: 15, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_reports_missing_anchor() {
        let launcher = MockLauncher::new();
        launcher.route("https://site/empty", "<p>no schedule today</p>");
        let pool = pool(&launcher);

        let lease = pool.lease().await.unwrap();
        let err = lease.navigate("https://site/empty", ".ready").await.unwrap_err();
        match err {
            AppError::ElementNotFound { selector } => assert_eq!(selector, ".ready"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_engine_errors_pass_through() {
        let launcher = MockLauncher::new();
        launcher.route_error("https://site/crash", "tab crashed");
        let pool = pool(&launcher);

        let lease = pool.lease().await.unwrap();
        let err = lease.fetch("https://site/crash", ".ready").await.unwrap_err();
        assert!(matches!(err, AppError::Browser(ref m) if m == "tab crashed"));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_returns_to_pool_on_error_paths() {
        let launcher = MockLauncher::new();
        launcher.route_hanging("https://site/slow");
        let pool = pool(&launcher);

        async fn scoped(pool: &Arc<SessionPool<MockLauncher>>) -> Result<(), AppError> {
            let lease = pool.lease().await?;
            lease.navigate("https://site/slow", ".ready").await?;
            Ok(())
        }

        assert!(scoped(&pool).await.is_err());
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().leased, 0);
    }

    #[tokio::test]
    async fn test_dropped_overflow_session_is_closed() {
        let launcher = MockLauncher::new();
        let pool = pool(&launcher);
        let mut held = Vec::new();
        for _ in 0..pool.capacity() {
            held.push(pool.lease().await.unwrap());
        }

        let overflow = pool.lease_or_overflow().await.unwrap();
        assert!(overflow.is_overflow());
        drop(overflow);

        // Background close runs on the current runtime.
        for _ in 0..10 {
            if launcher.closed() == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(launcher.closed(), 1);
    }
}
