use std::future::Future;

use crate::error::AppError;

/// One live handle to a rendering engine: it can load a URL and expose the
/// resulting DOM.
///
/// Implementations do not bound their own calls in time; [`crate::ScrapeSession`]
/// wraps them in the configured timeouts.
pub trait BrowserSession: Send + Sync + 'static {
    /// Navigate to `url` and resolve once the page has loaded.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Whether at least one element currently matches `selector`.
    fn has_element(&self, selector: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// The current DOM serialized as HTML.
    fn content(&self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Tear down the underlying engine. Must tolerate being the last call.
    fn close(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Creates new browser sessions on demand.
pub trait SessionLauncher: Send + Sync + 'static {
    type Session: BrowserSession;

    fn launch(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}
