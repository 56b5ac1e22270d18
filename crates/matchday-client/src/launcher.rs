use std::path::PathBuf;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use matchday_core::error::AppError;
use matchday_core::traits::SessionLauncher;

use crate::session::ChromeSession;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Launch options for each Chromium process.
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: String,
    /// Explicit browser binary. When unset, well-known install locations are
    /// searched and `chromiumoxide` falls back to its own lookup.
    pub executable: Option<PathBuf>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            executable: None,
        }
    }
}

impl ChromeConfig {
    /// Defaults, with `CHROME_BIN` and `MATCHDAY_HEADFUL=1` honoured.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(bin) = std::env::var("CHROME_BIN") {
            config.executable = Some(PathBuf::from(bin));
        }
        if std::env::var("MATCHDAY_HEADFUL").is_ok_and(|v| v == "1") {
            config.headless = false;
        }
        config
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn headful(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Command-line switches passed to every launched browser.
    fn args(&self) -> Vec<String> {
        let (width, height) = self.window_size;
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--no-first-run".to_string(),
            format!("--window-size={width},{height}"),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }
        args
    }
}

/// Launches one headless Chromium process per pooled session.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    config: ChromeConfig,
}

impl ChromeLauncher {
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// The snap wrapper at `/snap/bin/chromium` strips unknown CLI flags and
    /// breaks headless mode, so the binary inside the snap is tried first.
    fn find_chrome_binary(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.executable {
            if path.exists() {
                return Some(path.clone());
            }
            tracing::warn!(path = %path.display(), "Configured Chrome binary does not exist");
        }

        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = self.find_chrome_binary() {
            tracing::debug!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }

        let config = builder
            .args(self.config.args())
            .build()
            .map_err(|e| AppError::Browser(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(AppError::Browser(format!("Failed to open tab: {e}")));
            }
        };

        tracing::info!("Launched browser session");
        Ok(ChromeSession::new(browser, page, handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_args_include_window_and_agent() {
        let args = ChromeConfig::default().args();
        assert_eq!(args[0], "--headless=new");
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
    }

    #[test]
    fn test_headful_drops_headless_switch() {
        let args = ChromeConfig::default().headful().args();
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_missing_configured_binary_falls_back() {
        let launcher = ChromeLauncher::new(
            ChromeConfig::default().with_executable("/definitely/not/a/chrome"),
        );
        let found = launcher.find_chrome_binary();
        assert_ne!(found, Some(PathBuf::from("/definitely/not/a/chrome")));
    }
}
