//! Scripted in-memory driver for exercising engine logic without a browser.
//!
//! Tests queue per-method outcomes ahead of time; an empty queue yields
//! success (and `null` for script evaluation). Every call is recorded so
//! tests can assert on the exact interaction sequence.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DriverResult, PageDriver};
use crate::error::Result;
use crate::session::{SessionFactory, SessionHandle};
use crate::types::{Platform, StoredCookie};

/// One recorded driver interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
	Goto(String),
	Find(String),
	Click(String),
	Type(String, String),
	Evaluate(String),
	Cookies,
	SetCookies(usize),
	CurrentUrl,
}

#[derive(Default)]
struct Scripts {
	goto: VecDeque<DriverResult<()>>,
	find: VecDeque<DriverResult<()>>,
	click: VecDeque<DriverResult<()>>,
	type_text: VecDeque<DriverResult<()>>,
	evaluate: VecDeque<DriverResult<serde_json::Value>>,
}

/// Scripted [`PageDriver`] with call recording.
#[derive(Default)]
pub struct FakeDriver {
	scripts: Mutex<Scripts>,
	cookie_jar: Mutex<Vec<StoredCookie>>,
	url: Mutex<String>,
	calls: Mutex<Vec<FakeCall>>,
	/// Artificial latency applied to every `goto`.
	goto_delay: Mutex<Option<Duration>>,
}

impl FakeDriver {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn push_goto(&self, result: DriverResult<()>) {
		self.scripts.lock().goto.push_back(result);
	}

	pub fn push_find(&self, result: DriverResult<()>) {
		self.scripts.lock().find.push_back(result);
	}

	pub fn push_click(&self, result: DriverResult<()>) {
		self.scripts.lock().click.push_back(result);
	}

	pub fn push_type(&self, result: DriverResult<()>) {
		self.scripts.lock().type_text.push_back(result);
	}

	pub fn push_evaluate(&self, result: DriverResult<serde_json::Value>) {
		self.scripts.lock().evaluate.push_back(result);
	}

	pub fn seed_cookies(&self, cookies: Vec<StoredCookie>) {
		*self.cookie_jar.lock() = cookies;
	}

	pub fn set_current_url(&self, url: &str) {
		*self.url.lock() = url.to_string();
	}

	pub fn set_goto_delay(&self, delay: Duration) {
		*self.goto_delay.lock() = Some(delay);
	}

	pub fn calls(&self) -> Vec<FakeCall> {
		self.calls.lock().clone()
	}

	/// Cookies currently held by the fake session.
	pub fn cookie_jar(&self) -> Vec<StoredCookie> {
		self.cookie_jar.lock().clone()
	}

	fn record(&self, call: FakeCall) {
		self.calls.lock().push(call);
	}
}

#[async_trait]
impl PageDriver for FakeDriver {
	async fn goto(&self, url: &str, _deadline: Duration) -> DriverResult<()> {
		self.record(FakeCall::Goto(url.to_string()));
		let delay = *self.goto_delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		self.scripts.lock().goto.pop_front().unwrap_or(Ok(()))
	}

	async fn find(&self, selector: &str, _deadline: Duration) -> DriverResult<()> {
		self.record(FakeCall::Find(selector.to_string()));
		self.scripts.lock().find.pop_front().unwrap_or(Ok(()))
	}

	async fn click(&self, selector: &str) -> DriverResult<()> {
		self.record(FakeCall::Click(selector.to_string()));
		self.scripts.lock().click.pop_front().unwrap_or(Ok(()))
	}

	async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()> {
		self.record(FakeCall::Type(selector.to_string(), text.to_string()));
		self.scripts.lock().type_text.pop_front().unwrap_or(Ok(()))
	}

	async fn evaluate(&self, script: &str) -> DriverResult<serde_json::Value> {
		self.record(FakeCall::Evaluate(script.to_string()));
		self.scripts
			.lock()
			.evaluate
			.pop_front()
			.unwrap_or(Ok(serde_json::Value::Null))
	}

	async fn cookies(&self) -> DriverResult<Vec<StoredCookie>> {
		self.record(FakeCall::Cookies);
		Ok(self.cookie_jar.lock().clone())
	}

	async fn set_cookies(&self, cookies: Vec<StoredCookie>) -> DriverResult<()> {
		self.record(FakeCall::SetCookies(cookies.len()));
		*self.cookie_jar.lock() = cookies;
		Ok(())
	}

	async fn current_url(&self) -> DriverResult<String> {
		self.record(FakeCall::CurrentUrl);
		Ok(self.url.lock().clone())
	}
}

/// Session handle wrapping a [`FakeDriver`]; no OS process behind it.
pub struct FakeSession {
	driver: Arc<FakeDriver>,
}

#[async_trait]
impl SessionHandle for FakeSession {
	fn driver(&self) -> Arc<dyn PageDriver> {
		Arc::clone(&self.driver) as Arc<dyn PageDriver>
	}

	fn take_process(&mut self) -> Option<std::process::Child> {
		None
	}

	fn pid(&self) -> Option<u32> {
		None
	}

	async fn close(self: Box<Self>) {}
}

/// Factory handing out pre-scripted fake sessions.
///
/// Queued drivers are dispensed in order; when the queue is empty a fresh
/// unscripted driver is created. `opened()` counts factory invocations so
/// tests can assert that no session was allocated at all.
#[derive(Default)]
pub struct FakeSessionFactory {
	queued: Mutex<VecDeque<Arc<FakeDriver>>>,
	opened: Mutex<u32>,
	fail_next: Mutex<Option<String>>,
}

impl FakeSessionFactory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn queue_driver(&self, driver: Arc<FakeDriver>) {
		self.queued.lock().push_back(driver);
	}

	pub fn fail_next_open(&self, message: &str) {
		*self.fail_next.lock() = Some(message.to_string());
	}

	pub fn opened(&self) -> u32 {
		*self.opened.lock()
	}
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
	async fn open(&self, _platform: Platform, _headless: bool) -> Result<Box<dyn SessionHandle>> {
		*self.opened.lock() += 1;
		if let Some(message) = self.fail_next.lock().take() {
			return Err(crate::error::EngineError::BrowserLaunch(message));
		}
		let driver = self.queued.lock().pop_front().unwrap_or_else(FakeDriver::new);
		Ok(Box::new(FakeSession { driver }))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DriverError;

	#[tokio::test]
	async fn unscripted_calls_succeed_and_are_recorded() {
		let driver = FakeDriver::new();
		driver.goto("https://example.com", Duration::from_secs(1)).await.unwrap();
		driver.click("button").await.unwrap();
		assert_eq!(
			driver.calls(),
			vec![FakeCall::Goto("https://example.com".into()), FakeCall::Click("button".into())]
		);
	}

	#[tokio::test]
	async fn scripted_failures_are_replayed_in_order() {
		let driver = FakeDriver::new();
		driver.push_find(Err(DriverError::Missing { selector: "x".into() }));
		driver.push_find(Ok(()));
		assert!(driver.find("x", Duration::from_secs(1)).await.is_err());
		assert!(driver.find("x", Duration::from_secs(1)).await.is_ok());
	}
}
