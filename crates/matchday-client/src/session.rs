use chromiumoxide::{Browser, Page};
use matchday_core::error::AppError;
use matchday_core::traits::BrowserSession;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One Chromium process with a single tab.
///
/// Navigation reuses the tab; the pool guarantees one user at a time.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    pub(crate) fn new(browser: Browser, page: Page, handler: JoinHandle<()>) -> Self {
        Self {
            browser: Mutex::new(browser),
            page,
            handler,
        }
    }
}

/// JavaScript expression that is `true` once `selector` matches.
fn presence_script(selector: &str) -> Result<String, AppError> {
    let literal = serde_json::to_string(selector)?;
    Ok(format!("document.querySelector({literal}) !== null"))
}

impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::Browser(format!("Failed to navigate to {url}: {e}")))?;
        Ok(())
    }

    async fn has_element(&self, selector: &str) -> Result<bool, AppError> {
        let script = presence_script(selector)?;
        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| AppError::Browser(format!("Selector probe failed: {e}")))?;
        Ok(result.into_value::<bool>()?)
    }

    async fn content(&self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::Browser(format!("Failed to read page content: {e}")))
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map_err(|e| AppError::Browser(format!("Failed to close browser: {e}")));
        if closed.is_ok()
            && let Err(e) = browser.wait().await
        {
            tracing::debug!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}
