//! Interactive (human-completed) login detection.
//!
//! Platforms gate their login surfaces behind CAPTCHA and 2FA, so the
//! session is opened headful and a person finishes the form. The engine's
//! only job is to notice, within a long generous bound, that the DOM now
//! proves a logged-in state. Termination requests are honored while waiting.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::action::Actions;
use crate::error::{EngineError, Result};
use crate::platform::PlatformSpec;

/// Bounds for the human-completion wait.
#[derive(Debug, Clone)]
pub struct LoginConfig {
	/// Total time a person gets to complete the login.
	pub deadline: Duration,
	/// DOM poll interval while waiting.
	pub poll: Duration,
}

impl Default for LoginConfig {
	fn default() -> Self {
		Self {
			deadline: Duration::from_secs(180),
			poll: Duration::from_secs(2),
		}
	}
}

/// Opens the login surface and waits for the success signal.
///
/// Returns without persisting anything; the caller saves credentials only
/// after this resolves, so a timeout or cancellation leaves no partial
/// state behind.
pub async fn await_interactive_login(actions: &Actions<'_>, spec: &PlatformSpec, config: &LoginConfig) -> Result<()> {
	actions.navigate(spec.login_url).await?;
	info!(
		target = "xpub.login",
		platform = %spec.platform,
		request_id = actions.request_id(),
		deadline_secs = config.deadline.as_secs(),
		"waiting for interactive login"
	);

	let started = Instant::now();
	loop {
		actions.ensure_active()?;
		if actions.element_present(spec.login_success_selector, config.poll).await? {
			info!(
				target = "xpub.login",
				platform = %spec.platform,
				elapsed_secs = started.elapsed().as_secs(),
				"login detected"
			);
			return Ok(());
		}
		debug!(target = "xpub.login", platform = %spec.platform, "login not completed yet");
		tokio::time::sleep(config.poll).await;
		if started.elapsed() >= config.deadline {
			return Err(EngineError::SelectorTimeout {
				selector: spec.login_success_selector.to_string(),
				waited_ms: config.deadline.as_millis() as u64,
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::action::{ActionConfig, Actions};
	use crate::driver::fake::FakeDriver;
	use crate::error::DriverError;
	use crate::registry::SessionRegistry;
	use crate::types::{Platform, SessionKind};

	fn quick_config() -> LoginConfig {
		LoginConfig {
			deadline: Duration::from_millis(50),
			poll: Duration::from_millis(5),
		}
	}

	#[tokio::test]
	async fn detects_login_after_a_few_polls() {
		let registry = SessionRegistry::new();
		registry.register("req-login", Platform::RoyalRoad, SessionKind::Login, None, None);
		let driver = FakeDriver::new();
		driver.push_find(Err(DriverError::Missing { selector: "x".into() }));
		driver.push_find(Err(DriverError::Missing { selector: "x".into() }));
		driver.push_find(Ok(()));

		let spec = Platform::RoyalRoad.spec();
		let actions = Actions::new(driver.as_ref(), &registry, "req-login", ActionConfig::for_spec(spec));
		await_interactive_login(&actions, spec, &quick_config()).await.unwrap();
	}

	#[tokio::test]
	async fn gives_up_after_the_deadline() {
		let registry = SessionRegistry::new();
		registry.register("req-login2", Platform::RoyalRoad, SessionKind::Login, None, None);
		let driver = FakeDriver::new();
		for _ in 0..64 {
			driver.push_find(Err(DriverError::Missing { selector: "x".into() }));
		}

		let spec = Platform::RoyalRoad.spec();
		let actions = Actions::new(driver.as_ref(), &registry, "req-login2", ActionConfig::for_spec(spec));
		let err = await_interactive_login(&actions, spec, &quick_config()).await.unwrap_err();
		assert!(matches!(err, EngineError::SelectorTimeout { .. }));
	}

	#[tokio::test]
	async fn terminated_session_cancels_the_wait() {
		let registry = SessionRegistry::new();
		let driver = FakeDriver::new();
		let spec = Platform::RoyalRoad.spec();
		// Never registered: the first cancellation check trips.
		let actions = Actions::new(driver.as_ref(), &registry, "req-login3", ActionConfig::for_spec(spec));
		let err = await_interactive_login(&actions, spec, &quick_config()).await.unwrap_err();
		assert!(err.is_cancelled());
	}
}
