//! Chromium-backed rendering sessions for `matchday-core`.
//!
//! Enabled by the default `browser` feature; with it turned off the crate is
//! empty and callers must bring their own [`matchday_core::SessionLauncher`].

#[cfg(feature = "browser")]
pub mod launcher;
#[cfg(feature = "browser")]
pub mod session;

#[cfg(feature = "browser")]
pub use launcher::{ChromeConfig, ChromeLauncher};
#[cfg(feature = "browser")]
pub use session::ChromeSession;
