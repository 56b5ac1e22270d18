//! Test utilities: mock implementations of the browser traits and HTML
//! fixtures for the target site.
//!
//! All mocks share state through `Arc<Mutex<_>>`, allowing test assertions
//! on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::batch::{BatchEvent, BatchReporter};
use crate::dom::{Document, compile};
use crate::error::AppError;
use crate::traits::{BrowserSession, SessionLauncher};

// ---------------------------------------------------------------------------
// MockLauncher / MockSession
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Route {
    Page(String),
    /// Navigation never completes.
    Hang,
    Fail(String),
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Route>,
    visited: Vec<String>,
    launched: usize,
    close_attempts: usize,
    closed: usize,
    fail_next_launch: bool,
    fail_close: HashSet<usize>,
    hang_close: HashSet<usize>,
}

/// Launcher serving canned pages by exact URL. Unknown URLs load an empty page.
#[derive(Clone, Default)]
pub struct MockLauncher {
    state: Arc<Mutex<MockState>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, html: &str) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), Route::Page(html.to_string()));
    }

    pub fn route_hanging(&self, url: &str) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), Route::Hang);
    }

    pub fn route_error(&self, url: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), Route::Fail(message.to_string()));
    }

    pub fn fail_next_launch(&self) {
        self.state.lock().unwrap().fail_next_launch = true;
    }

    pub fn fail_close_for(&self, session_id: usize) {
        self.state.lock().unwrap().fail_close.insert(session_id);
    }

    pub fn hang_close_for(&self, session_id: usize) {
        self.state.lock().unwrap().hang_close.insert(session_id);
    }

    pub fn launched(&self) -> usize {
        self.state.lock().unwrap().launched
    }

    pub fn close_attempts(&self) -> usize {
        self.state.lock().unwrap().close_attempts
    }

    /// Successful closes.
    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }
}

impl SessionLauncher for MockLauncher {
    type Session = MockSession;

    async fn launch(&self) -> Result<MockSession, AppError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_launch) {
            return Err(AppError::Browser("failed to launch browser".into()));
        }
        state.launched += 1;
        Ok(MockSession {
            id: state.launched,
            state: Arc::clone(&self.state),
            current: Mutex::new(String::new()),
        })
    }
}

pub struct MockSession {
    id: usize,
    state: Arc<Mutex<MockState>>,
    current: Mutex<String>,
}

impl MockSession {
    /// 1-based launch order.
    pub fn id(&self) -> usize {
        self.id
    }
}

fn page_contains(html: &str, selector: &str) -> Result<bool, AppError> {
    let selector = compile(selector)?;
    Ok(Document::parse(html).contains(&selector))
}

impl BrowserSession for MockSession {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        let route = {
            let mut state = self.state.lock().unwrap();
            state.visited.push(url.to_string());
            state.routes.get(url).cloned()
        };

        match route {
            Some(Route::Page(html)) => {
                *self.current.lock().unwrap() = html;
                Ok(())
            }
            Some(Route::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Route::Fail(message)) => Err(AppError::Browser(message)),
            None => {
                *self.current.lock().unwrap() = "<html><body></body></html>".to_string();
                Ok(())
            }
        }
    }

    async fn has_element(&self, selector: &str) -> Result<bool, AppError> {
        let html = self.current.lock().unwrap().clone();
        page_contains(&html, selector)
    }

    async fn content(&self) -> Result<String, AppError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn close(&self) -> Result<(), AppError> {
        let (fail, hang) = {
            let mut state = self.state.lock().unwrap();
            state.close_attempts += 1;
            (
                state.fail_close.contains(&self.id),
                state.hang_close.contains(&self.id),
            )
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(AppError::Browser("browser refused to close".into()));
        }
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl BatchReporter for MockReporter {
    fn report(&self, event: BatchEvent<'_>) {
        let label = match &event {
            BatchEvent::RunStarted { .. } => "RunStarted".to_string(),
            BatchEvent::DayCompleted { date, matches, .. } => {
                format!("DayCompleted:{date}:{matches}")
            }
            BatchEvent::DayFailed { date, .. } => format!("DayFailed:{date}"),
            BatchEvent::DetailCompleted { ext_id, .. } => format!("DetailCompleted:{ext_id}"),
            BatchEvent::DetailFailed { ext_id, .. } => format!("DetailFailed:{ext_id}"),
            BatchEvent::RunFinished { matches, failed_days, .. } => {
                format!("RunFinished:{matches}:{failed_days}")
            }
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// HTML fixtures
// ---------------------------------------------------------------------------

/// One schedule table row with every column populated.
pub fn schedule_row(
    id: &str,
    time: &str,
    status_cell: &str,
    home: &str,
    score: &str,
    away: &str,
    href: &str,
) -> String {
    format!(
        r#"<tr id="{id}">
            <td>{time}</td>
            <td>{status_cell}</td>
            <td>{home}</td>
            <td><img src="https://cdn.example.com/{home}.png"></td>
            <td>{score}</td>
            <td><img src="https://cdn.example.com/{away}.png"></td>
            <td>{away}</td>
            <td><a href="{href}">more</a></td>
        </tr>"#
    )
}

pub const FINISHED_CELL: &str = r#"<span class="matchcenter-sprite-finished"></span>"#;

/// A schedule page: one tournament header and one table per section.
pub fn schedule_page(sections: &[(&str, Vec<String>)]) -> String {
    let mut body = String::from(r#"<div class="match-center-list">"#);
    for (tournament, rows) in sections {
        body.push_str(&format!(
            r#"<div class="tourney-name">{tournament}</div><table class="games-table"><tbody>{}</tbody></table>"#,
            rows.concat()
        ));
    }
    body.push_str("</div>");
    format!("<html><body>{body}</body></html>")
}
