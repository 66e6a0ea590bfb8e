//! Resilient action layer: every browser interaction the workflow performs
//! goes through here, gaining bounded retry, adaptive timeouts, cancellation
//! checks, and a diagnosable log trail.

use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::error::{DriverError, EngineError, Result};
use crate::platform::PlatformSpec;
use crate::registry::SessionRegistry;
use crate::types::StoredCookie;

/// Retry and timeout parameters for one session's actions.
#[derive(Debug, Clone)]
pub struct ActionConfig {
	pub nav_max_attempts: u32,
	pub nav_floor: Duration,
	pub nav_ceiling: Duration,
	/// Linear backoff unit between navigation retries.
	pub backoff_base: Duration,
	pub wait_timeout: Duration,
	pub wait_max_attempts: u32,
	pub inject_max_attempts: u32,
	pub inject_pause: Duration,
}

impl ActionConfig {
	/// Defaults tuned from a platform's navigation bounds.
	pub fn for_spec(spec: &PlatformSpec) -> Self {
		Self {
			nav_max_attempts: 3,
			nav_floor: Duration::from_millis(spec.nav_timeout_floor_ms),
			nav_ceiling: Duration::from_millis(spec.nav_timeout_ceiling_ms),
			backoff_base: Duration::from_millis(500),
			wait_timeout: Duration::from_secs(5),
			wait_max_attempts: 3,
			inject_max_attempts: 10,
			inject_pause: Duration::from_millis(300),
		}
	}
}

/// Rescales the adaptive navigation timeout from an observed latency,
/// clamped to the configured floor and ceiling.
pub fn rescale_timeout(observed: Duration, floor: Duration, ceiling: Duration) -> Duration {
	observed.mul_f64(1.5).clamp(floor, ceiling)
}

/// Action executor bound to one session and one request id.
pub struct Actions<'a> {
	driver: &'a dyn PageDriver,
	registry: &'a SessionRegistry,
	request_id: &'a str,
	config: ActionConfig,
	/// Adaptive per-navigation timeout, rescaled after each attempt.
	nav_timeout: Mutex<Duration>,
}

impl<'a> Actions<'a> {
	pub fn new(driver: &'a dyn PageDriver, registry: &'a SessionRegistry, request_id: &'a str, config: ActionConfig) -> Self {
		let nav_timeout = Mutex::new(config.nav_floor);
		Self {
			driver,
			registry,
			request_id,
			config,
			nav_timeout,
		}
	}

	pub fn request_id(&self) -> &str {
		self.request_id
	}

	/// Current adaptive navigation timeout (observable for tests).
	pub fn nav_timeout(&self) -> Duration {
		*self.nav_timeout.lock()
	}

	/// Fails fast with [`EngineError::Cancelled`] once the registry no
	/// longer lists this request.
	pub fn ensure_active(&self) -> Result<()> {
		if self.registry.is_active(self.request_id) {
			Ok(())
		} else {
			Err(EngineError::Cancelled { request_id: self.request_id.to_string() })
		}
	}

	/// Navigates with adaptive timeout and linear-backoff retries.
	pub async fn navigate(&self, url: &str) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, %url, "navigate: start");
		let mut attempt = 1u32;
		loop {
			let deadline = *self.nav_timeout.lock();
			let started = Instant::now();
			let outcome = self.driver.goto(url, deadline).await;
			let observed = started.elapsed();
			*self.nav_timeout.lock() = rescale_timeout(observed, self.config.nav_floor, self.config.nav_ceiling);

			match outcome {
				Ok(()) => {
					info!(
						target = "xpub.action",
						request_id = self.request_id,
						attempt,
						elapsed_ms = observed.as_millis() as u64,
						"navigate: ok"
					);
					return Ok(());
				}
				Err(err) => {
					warn!(target = "xpub.action", request_id = self.request_id, attempt, error = %err, "navigate: attempt failed");
					if attempt >= self.config.nav_max_attempts {
						return Err(EngineError::Navigation { url: url.to_string(), attempts: attempt });
					}
					self.ensure_active()?;
					sleep(self.config.backoff_base * attempt).await;
					// A terminate issued during the pause must skip the
					// next attempt entirely.
					self.ensure_active()?;
					attempt += 1;
				}
			}
		}
	}

	/// Waits for an element, retrying only while it has not appeared yet.
	pub async fn wait_for_element(&self, selector: &str) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, selector, "wait: start");
		for attempt in 1..=self.config.wait_max_attempts {
			match self.driver.find(selector, self.config.wait_timeout).await {
				Ok(()) => {
					info!(target = "xpub.action", request_id = self.request_id, selector, attempt, "wait: found");
					return Ok(());
				}
				Err(DriverError::Missing { .. }) if attempt < self.config.wait_max_attempts => {
					warn!(target = "xpub.action", request_id = self.request_id, selector, attempt, "wait: not found yet");
					self.ensure_active()?;
				}
				Err(DriverError::Missing { .. }) => {
					let waited_ms = self.config.wait_timeout.as_millis() as u64 * u64::from(self.config.wait_max_attempts);
					warn!(target = "xpub.action", request_id = self.request_id, selector, attempt, "wait: exhausted");
					return Err(EngineError::SelectorTimeout { selector: selector.to_string(), waited_ms });
				}
				Err(err) => {
					warn!(target = "xpub.action", request_id = self.request_id, selector, attempt, error = %err, "wait: failed");
					return Err(err.into());
				}
			}
		}
		unreachable!("wait loop covers all attempts");
	}

	/// Probes for an element without treating absence as an error.
	pub async fn element_present(&self, selector: &str, deadline: Duration) -> Result<bool> {
		match self.driver.find(selector, deadline).await {
			Ok(()) => Ok(true),
			Err(DriverError::Missing { .. }) => Ok(false),
			Err(err) => Err(err.into()),
		}
	}

	/// Single-attempt click; blind repetition this close to submission is
	/// unsafe, so failures surface immediately (cancellation first).
	pub async fn click(&self, selector: &str) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, selector, "click");
		match self.driver.click(selector).await {
			Ok(()) => Ok(()),
			Err(err) => {
				self.ensure_active()?;
				warn!(target = "xpub.action", request_id = self.request_id, selector, error = %err, "click: failed");
				Err(err.into())
			}
		}
	}

	/// Single-attempt typing, same policy as [`Actions::click`].
	pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, selector, chars = text.len(), "type");
		match self.driver.type_text(selector, text).await {
			Ok(()) => Ok(()),
			Err(err) => {
				self.ensure_active()?;
				warn!(target = "xpub.action", request_id = self.request_id, selector, error = %err, "type: failed");
				Err(err.into())
			}
		}
	}

	/// Polls for the rich-text editing surface to become ready, applies the
	/// content there, and falls back to direct markup replacement when the
	/// editor never comes up.
	pub async fn inject_content(&self, spec: &PlatformSpec, content: &str) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, bytes = content.len(), "inject: start");
		let probe = editor_ready_script(spec);
		let apply = apply_content_script(spec, content)?;

		for attempt in 1..=self.config.inject_max_attempts {
			match self.driver.evaluate(&probe).await {
				Ok(Value::Bool(true)) => match self.driver.evaluate(&apply).await {
					Ok(Value::Bool(true)) => {
						info!(target = "xpub.action", request_id = self.request_id, attempt, "inject: applied");
						return Ok(());
					}
					Ok(_) => {
						debug!(target = "xpub.action", request_id = self.request_id, attempt, "inject: editor rejected content");
					}
					Err(err) => {
						warn!(target = "xpub.action", request_id = self.request_id, attempt, error = %err, "inject: apply failed");
					}
				},
				Ok(_) => {
					debug!(target = "xpub.action", request_id = self.request_id, attempt, "inject: editor not ready");
				}
				Err(err) => {
					warn!(target = "xpub.action", request_id = self.request_id, attempt, error = %err, "inject: probe failed");
				}
			}
			self.ensure_active()?;
			sleep(self.config.inject_pause).await;
		}

		// Last resort: bypass the editor and replace the markup directly.
		warn!(target = "xpub.action", request_id = self.request_id, "inject: editor never became ready; using markup fallback");
		let fallback = fallback_markup_script(spec, content)?;
		match self.driver.evaluate(&fallback).await? {
			Value::Bool(true) => Ok(()),
			_ => Err(EngineError::Submission {
				platform: spec.platform,
				detail: "content could not be injected through editor or fallback".to_string(),
			}),
		}
	}

	/// Reads the live cookie set from the session.
	pub async fn read_cookies(&self) -> Result<Vec<StoredCookie>> {
		Ok(self.driver.cookies().await?)
	}

	/// Injects a persisted cookie set into the session.
	pub async fn set_cookies(&self, cookies: Vec<StoredCookie>) -> Result<()> {
		info!(target = "xpub.action", request_id = self.request_id, count = cookies.len(), "inject cookies");
		Ok(self.driver.set_cookies(cookies).await?)
	}

	/// Evaluates a script through the driver.
	pub async fn evaluate(&self, script: &str) -> Result<Value> {
		Ok(self.driver.evaluate(script).await?)
	}

	/// Best-effort current page URL.
	pub async fn current_url(&self) -> Option<String> {
		self.driver.current_url().await.ok()
	}
}

fn editor_ready_script(spec: &PlatformSpec) -> String {
	match spec.content_frame {
		Some(frame) => format!(
			"(() => {{ const f = document.querySelector(\"{frame}\"); \
			 if (!f || !f.contentDocument) return false; \
			 return !!f.contentDocument.querySelector(\"{body}\"); }})()",
			body = spec.editor_body_selector,
		),
		None => format!("!!document.querySelector(\"{}\")", spec.editor_body_selector),
	}
}

fn apply_content_script(spec: &PlatformSpec, content: &str) -> Result<String> {
	let encoded = serde_json::to_string(content)?;
	let doc = match spec.content_frame {
		Some(frame) => format!("document.querySelector(\"{frame}\").contentDocument"),
		None => "document".to_string(),
	};
	Ok(format!(
		"(() => {{ const d = {doc}; const b = d.querySelector(\"{body}\"); \
		 if (!b) return false; b.innerHTML = {encoded}; \
		 b.dispatchEvent(new Event(\"input\", {{ bubbles: true }})); return true; }})()",
		body = spec.editor_body_selector,
	))
}

fn fallback_markup_script(spec: &PlatformSpec, content: &str) -> Result<String> {
	let encoded = serde_json::to_string(content)?;
	let target = spec.markup_fallback_selector.unwrap_or(spec.editor_body_selector);
	Ok(format!(
		"(() => {{ const t = document.querySelector(\"{target}\"); \
		 if (!t) return false; \
		 if (\"value\" in t) {{ t.value = {encoded}; }} else {{ t.innerHTML = {encoded}; }} \
		 return true; }})()",
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::driver::fake::{FakeCall, FakeDriver};
	use crate::types::{Platform, SessionKind};

	fn test_config() -> ActionConfig {
		ActionConfig {
			nav_max_attempts: 3,
			nav_floor: Duration::from_millis(100),
			nav_ceiling: Duration::from_millis(1_000),
			backoff_base: Duration::from_millis(20),
			wait_timeout: Duration::from_millis(50),
			wait_max_attempts: 3,
			inject_max_attempts: 2,
			inject_pause: Duration::from_millis(5),
		}
	}

	fn registered(registry: &SessionRegistry, request_id: &str) {
		registry.register(request_id, Platform::RoyalRoad, SessionKind::Publish, None, None);
	}

	fn missing() -> DriverError {
		DriverError::Missing { selector: "x".into() }
	}

	#[test]
	fn rescale_respects_floor_and_ceiling() {
		let floor = Duration::from_millis(100);
		let ceiling = Duration::from_millis(1_000);
		for observed_ms in [0u64, 1, 50, 66, 67, 100, 400, 666, 667, 5_000, 60_000] {
			let rescaled = rescale_timeout(Duration::from_millis(observed_ms), floor, ceiling);
			assert!(rescaled >= floor, "observed {observed_ms}ms fell below floor");
			assert!(rescaled <= ceiling, "observed {observed_ms}ms exceeded ceiling");
		}
		assert_eq!(rescale_timeout(Duration::from_millis(400), floor, ceiling), Duration::from_millis(600));
	}

	#[tokio::test]
	async fn navigate_retries_up_to_max_then_fails() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-nav");
		let driver = FakeDriver::new();
		for _ in 0..5 {
			driver.push_goto(Err(DriverError::Protocol("net::ERR_TIMED_OUT".into())));
		}

		let actions = Actions::new(driver.as_ref(), &registry, "req-nav", test_config());
		let err = actions.navigate("https://example.com").await.unwrap_err();
		assert!(matches!(err, EngineError::Navigation { attempts: 3, .. }));

		let attempts = driver.calls().iter().filter(|c| matches!(c, FakeCall::Goto(_))).count();
		assert_eq!(attempts, 3, "retry count must not exceed the configured maximum");
	}

	#[tokio::test]
	async fn navigate_succeeds_after_transient_failure() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-nav2");
		let driver = FakeDriver::new();
		driver.push_goto(Err(DriverError::Timeout { ms: 100 }));
		driver.push_goto(Ok(()));

		let actions = Actions::new(driver.as_ref(), &registry, "req-nav2", test_config());
		actions.navigate("https://example.com").await.unwrap();
	}

	#[tokio::test]
	async fn navigate_rescales_timeout_within_bounds() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-nav3");
		let driver = FakeDriver::new();
		driver.set_goto_delay(Duration::from_millis(30));

		let actions = Actions::new(driver.as_ref(), &registry, "req-nav3", test_config());
		for _ in 0..4 {
			actions.navigate("https://example.com").await.unwrap();
			assert!(actions.nav_timeout() >= Duration::from_millis(100));
			assert!(actions.nav_timeout() <= Duration::from_millis(1_000));
		}
	}

	#[tokio::test]
	async fn cancellation_during_backoff_pause_skips_next_attempt() {
		let registry = std::sync::Arc::new(SessionRegistry::new());
		registered(&registry, "req-cancel");
		let driver = FakeDriver::new();
		driver.push_goto(Err(DriverError::Protocol("boom".into())));

		let canceller = {
			let registry = std::sync::Arc::clone(&registry);
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(5)).await;
				registry.terminate("req-cancel");
			})
		};

		let actions = Actions::new(driver.as_ref(), &registry, "req-cancel", test_config());
		let err = actions.navigate("https://example.com").await.unwrap_err();
		canceller.await.unwrap();

		assert!(err.is_cancelled());
		let attempts = driver.calls().iter().filter(|c| matches!(c, FakeCall::Goto(_))).count();
		assert_eq!(attempts, 1, "the attempt after the pause must be skipped");
	}

	#[tokio::test]
	async fn wait_retries_only_while_not_found() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-wait");
		let driver = FakeDriver::new();
		driver.push_find(Err(missing()));
		driver.push_find(Ok(()));

		let actions = Actions::new(driver.as_ref(), &registry, "req-wait", test_config());
		actions.wait_for_element("#title").await.unwrap();

		// A non-"missing" error must not be retried.
		driver.push_find(Err(DriverError::Protocol("detached".into())));
		let err = actions.wait_for_element("#title").await.unwrap_err();
		assert!(matches!(err, EngineError::Driver(DriverError::Protocol(_))));
		let finds = driver.calls().iter().filter(|c| matches!(c, FakeCall::Find(_))).count();
		assert_eq!(finds, 3);
	}

	#[tokio::test]
	async fn wait_exhaustion_reports_selector_timeout() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-wait2");
		let driver = FakeDriver::new();
		for _ in 0..3 {
			driver.push_find(Err(missing()));
		}

		let actions = Actions::new(driver.as_ref(), &registry, "req-wait2", test_config());
		let err = actions.wait_for_element("#never").await.unwrap_err();
		assert!(matches!(err, EngineError::SelectorTimeout { .. }));
		let finds = driver.calls().iter().filter(|c| matches!(c, FakeCall::Find(_))).count();
		assert_eq!(finds, 3, "wait attempts must not exceed the configured maximum");
	}

	#[tokio::test]
	async fn click_failure_on_terminated_session_reports_cancelled() {
		let registry = SessionRegistry::new();
		let driver = FakeDriver::new();
		driver.push_click(Err(DriverError::Protocol("target closed".into())));

		// Never registered: the click error must surface as cancellation.
		let actions = Actions::new(driver.as_ref(), &registry, "req-gone", test_config());
		let err = actions.click("button").await.unwrap_err();
		assert!(err.is_cancelled());
	}

	#[tokio::test]
	async fn type_failure_on_live_session_surfaces_the_driver_error() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-type");
		let driver = FakeDriver::new();
		driver.push_type(Err(DriverError::Protocol("element not editable".into())));

		let actions = Actions::new(driver.as_ref(), &registry, "req-type", test_config());
		let err = actions.type_text("input#Title", "Chapter 1").await.unwrap_err();
		// The session is still active, so this is a genuine failure, and
		// typing must not be blindly repeated.
		assert!(matches!(err, EngineError::Driver(DriverError::Protocol(_))));
		let types = driver.calls().iter().filter(|c| matches!(c, FakeCall::Type(..))).count();
		assert_eq!(types, 1);
	}

	#[tokio::test]
	async fn inject_falls_back_to_markup_replacement() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-inject");
		let driver = FakeDriver::new();
		// Editor never becomes ready across both attempts.
		driver.push_evaluate(Ok(Value::Bool(false)));
		driver.push_evaluate(Ok(Value::Bool(false)));
		// Fallback script succeeds.
		driver.push_evaluate(Ok(Value::Bool(true)));

		let actions = Actions::new(driver.as_ref(), &registry, "req-inject", test_config());
		actions.inject_content(Platform::RoyalRoad.spec(), "<p>body</p>").await.unwrap();

		let evals: Vec<_> = driver
			.calls()
			.into_iter()
			.filter_map(|c| match c {
				FakeCall::Evaluate(s) => Some(s),
				_ => None,
			})
			.collect();
		assert_eq!(evals.len(), 3);
		assert!(evals[2].contains("textarea#Content"), "fallback must target the raw markup selector");
	}

	#[tokio::test]
	async fn inject_applies_through_ready_editor() {
		let registry = SessionRegistry::new();
		registered(&registry, "req-inject2");
		let driver = FakeDriver::new();
		driver.push_evaluate(Ok(Value::Bool(true)));
		driver.push_evaluate(Ok(Value::Bool(true)));

		let actions = Actions::new(driver.as_ref(), &registry, "req-inject2", test_config());
		actions.inject_content(Platform::RoyalRoad.spec(), "<p>body</p>").await.unwrap();
		let evals = driver.calls().iter().filter(|c| matches!(c, FakeCall::Evaluate(_))).count();
		assert_eq!(evals, 2);
	}
}
