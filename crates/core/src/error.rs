//! Error taxonomy for the publishing engine.

use crate::types::Platform;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Low-level browser failures, before engine context is attached.
///
/// The action layer decides retry eligibility from these variants:
/// [`DriverError::Missing`] means "not found yet" and may be retried,
/// everything else is surfaced as-is.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
	/// Element did not appear within the polled window.
	#[error("element not found: {selector}")]
	Missing { selector: String },

	/// A single browser call exceeded its deadline.
	#[error("browser call timed out after {ms}ms")]
	Timeout { ms: u64 },

	/// CDP or page-level failure.
	#[error("browser protocol error: {0}")]
	Protocol(String),
}

/// Engine-level failures carried back to the control surface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	/// Navigation retries exhausted.
	#[error("navigation to {url} failed after {attempts} attempts")]
	Navigation { url: String, attempts: u32 },

	/// An element never appeared within its bounded wait.
	#[error("selector {selector:?} never appeared within {waited_ms}ms")]
	SelectorTimeout { selector: String, waited_ms: u64 },

	/// The registry no longer lists the request; the session was terminated.
	#[error("action cancelled: request {request_id} is no longer active")]
	Cancelled { request_id: String },

	/// No stored credentials for the platform; an interactive login is needed.
	#[error("{platform} requires login before publishing")]
	AuthenticationRequired { platform: Platform },

	/// The fuzzy matcher exhausted every strategy, including refresh.
	#[error("no series on the platform matched folder {folder:?}")]
	NoMatchFound { folder: String },

	/// The confirmation signal never appeared after submit.
	#[error("{platform} submission failed: {detail}")]
	Submission { platform: Platform, detail: String },

	/// Browser process spawn or CDP attach failed.
	#[error("failed to launch browser: {0}")]
	BrowserLaunch(String),

	#[error(transparent)]
	Driver(#[from] DriverError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl EngineError {
	/// True when the failure is a cooperative cancellation rather than a
	/// genuine error. Callers use this to avoid surfacing a user-requested
	/// termination as a failure.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}
}
