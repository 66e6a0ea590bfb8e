//! Browser driver seam between the action layer and the CDP client.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::types::StoredCookie;

/// CDP-backed driver over a live page.
pub mod cdp;
/// Scripted in-memory driver for tests.
pub mod fake;

pub use cdp::CdpDriver;
pub use fake::FakeDriver;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Single-shot browser operations on one controlled page.
///
/// Implementations perform exactly one attempt per call; retry policy,
/// adaptive timeouts, and cancellation all live in the action layer above.
#[async_trait]
pub trait PageDriver: Send + Sync {
	/// Navigates the page, bounded by `deadline`.
	async fn goto(&self, url: &str, deadline: Duration) -> DriverResult<()>;

	/// Polls for an element until `deadline`; [`DriverError::Missing`]
	/// means the element has not appeared yet.
	async fn find(&self, selector: &str, deadline: Duration) -> DriverResult<()>;

	/// Clicks the first element matching `selector`.
	async fn click(&self, selector: &str) -> DriverResult<()>;

	/// Focuses the element and types `text` into it.
	async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()>;

	/// Evaluates a script in the page and returns its JSON value.
	async fn evaluate(&self, script: &str) -> DriverResult<serde_json::Value>;

	/// Reads the live cookie set for the session.
	async fn cookies(&self) -> DriverResult<Vec<StoredCookie>>;

	/// Injects cookies into the session.
	async fn set_cookies(&self, cookies: Vec<StoredCookie>) -> DriverResult<()>;

	/// Current page URL, if the page reports one.
	async fn current_url(&self) -> DriverResult<String>;
}
