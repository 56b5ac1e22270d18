//! Fixed-capacity pool of browser sessions.
//!
//! Sessions are launched lazily, up to `capacity`, and handed out wrapped in
//! a [`ScrapeSession`] that returns them on every exit path. A semaphore with
//! `capacity` permits bounds the number of concurrent leases; the
//! bookkeeping mutex is only held for O(1) updates, never across a launch,
//! a navigation or a close.
//!
//! ```text
//! lease()  ──permit──> idle? ──yes──> hand out
//!                        └──no───> launch (unlocked) ──> record as created
//! release  ──> back to idle (or dropped if the pool is shut down) ──> permit freed
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::config::ScraperConfig;
use crate::error::AppError;
use crate::session::{ScrapeSession, SessionTimeouts};
use crate::traits::{BrowserSession, SessionLauncher};

/// Upper bound on closing a single session during shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Point-in-time counters, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub created: usize,
    pub idle: usize,
    pub leased: usize,
}

struct PoolInner<S> {
    /// Every session launched by the pool and not yet closed.
    created: Vec<Arc<S>>,
    idle: Vec<Arc<S>>,
    closed: bool,
}

/// Thread-safe pool of at most `capacity` browser sessions.
pub struct SessionPool<L: SessionLauncher> {
    launcher: L,
    capacity: usize,
    lease_timeout: Duration,
    timeouts: SessionTimeouts,
    permits: Arc<Semaphore>,
    inner: Mutex<PoolInner<L::Session>>,
}

impl<L: SessionLauncher> SessionPool<L> {
    pub fn new(launcher: L, config: &ScraperConfig) -> Arc<Self> {
        let capacity = config.pool_capacity.max(1);
        Arc::new(Self {
            launcher,
            capacity,
            lease_timeout: config.lease_timeout,
            timeouts: SessionTimeouts::from(config),
            permits: Arc::new(Semaphore::new(capacity)),
            inner: Mutex::new(PoolInner {
                created: Vec::new(),
                idle: Vec::new(),
                closed: false,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquires the bookkeeping lock, recovering from poison if necessary.
    fn lock_inner(&self) -> MutexGuard<'_, PoolInner<L::Session>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Session pool recovered from poisoned mutex");
            poisoned.into_inner()
        })
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.lock_inner();
        PoolStats {
            capacity: self.capacity,
            created: inner.created.len(),
            idle: inner.idle.len(),
            leased: inner.created.len() - inner.idle.len(),
        }
    }

    /// Lease a session, waiting up to the configured lease timeout for one
    /// to be released.
    ///
    /// Fails with [`AppError::PoolExhausted`] when the wait times out and
    /// with [`AppError::PoolClosed`] once [`shutdown`](Self::shutdown) ran.
    pub async fn lease(self: &Arc<Self>) -> Result<ScrapeSession<L>, AppError> {
        let acquire = Arc::clone(&self.permits).acquire_owned();
        let permit = match tokio::time::timeout(self.lease_timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(AppError::PoolClosed),
            Err(_) => {
                tracing::warn!(
                    waited_secs = self.lease_timeout.as_secs(),
                    "Timed out waiting for a browser session"
                );
                return Err(AppError::PoolExhausted);
            }
        };
        self.check_out(permit).await
    }

    /// Lease a session without waiting: [`AppError::PoolExhausted`] if all
    /// `capacity` sessions are currently leased.
    pub async fn try_lease(self: &Arc<Self>) -> Result<ScrapeSession<L>, AppError> {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::Closed => AppError::PoolClosed,
                TryAcquireError::NoPermits => AppError::PoolExhausted,
            })?;
        self.check_out(permit).await
    }

    /// Lease a pooled session if one is free right now, otherwise launch a
    /// standalone overflow session that is closed, not pooled, when its
    /// scope ends. Overflow sessions do not count towards `capacity`.
    pub async fn lease_or_overflow(self: &Arc<Self>) -> Result<ScrapeSession<L>, AppError> {
        match self.try_lease().await {
            Err(AppError::PoolExhausted) => {
                tracing::info!(
                    capacity = self.capacity,
                    "Session pool exhausted, launching overflow session"
                );
                let session = self.launcher.launch().await?;
                Ok(ScrapeSession::overflow(Arc::new(session), self.timeouts))
            }
            other => other,
        }
    }

    async fn check_out(
        self: &Arc<Self>,
        permit: OwnedSemaphorePermit,
    ) -> Result<ScrapeSession<L>, AppError> {
        let reused = {
            let mut inner = self.lock_inner();
            if inner.closed {
                return Err(AppError::PoolClosed);
            }
            inner.idle.pop()
        };

        if let Some(session) = reused {
            return Ok(ScrapeSession::pooled(
                Arc::clone(self),
                session,
                permit,
                self.timeouts,
            ));
        }

        let launched = self.launcher.launch().await;
        let (session, admitted) = {
            let mut inner = self.lock_inner();
            let session = Arc::new(launched?);
            let admitted = !inner.closed;
            if admitted {
                inner.created.push(Arc::clone(&session));
                tracing::debug!(
                    created = inner.created.len(),
                    capacity = self.capacity,
                    "Launched pooled browser session"
                );
            }
            (session, admitted)
        };

        if !admitted {
            // Shut down while launching.
            close_quietly(&*session).await;
            return Err(AppError::PoolClosed);
        }

        Ok(ScrapeSession::pooled(
            Arc::clone(self),
            session,
            permit,
            self.timeouts,
        ))
    }

    /// Return a session to the idle set. Never closes it, unless the pool
    /// has been shut down, in which case shutdown already closed it and the
    /// handle is simply dropped.
    pub(crate) fn release(&self, session: Arc<L::Session>) {
        let mut inner = self.lock_inner();
        if inner.closed {
            return;
        }
        inner.idle.push(session);
    }

    /// Close every session the pool created, leased or idle.
    ///
    /// Close failures and stuck closes are logged and skipped so one bad
    /// session cannot block the rest. Waiting and future leases fail with
    /// [`AppError::PoolClosed`]. Calling this twice is a no-op.
    pub async fn shutdown(&self) {
        self.permits.close();
        let sessions = {
            let mut inner = self.lock_inner();
            inner.closed = true;
            inner.idle.clear();
            std::mem::take(&mut inner.created)
        };

        if sessions.is_empty() {
            return;
        }

        tracing::info!(sessions = sessions.len(), "Shutting down session pool");
        join_all(sessions.iter().map(|session| close_quietly(&**session))).await;
    }
}

async fn close_quietly<S: BrowserSession>(session: &S) {
    match tokio::time::timeout(CLOSE_TIMEOUT, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to close browser session"),
        Err(_) => tracing::warn!(
            timeout_secs = CLOSE_TIMEOUT.as_secs(),
            "Browser session did not close in time"
        ),
    }
}
