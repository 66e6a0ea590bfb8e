//! Control facade: the synchronous login/publish/terminate boundary the
//! authoring subsystem calls.
//!
//! Each login/publish call allocates a fresh session, registers it, runs
//! the flow to completion, and releases the session in a guaranteed cleanup
//! path regardless of outcome.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::action::{ActionConfig, Actions};
use crate::driver::PageDriver;
use crate::error::{EngineError, Result};
use crate::login::{self, LoginConfig};
use crate::registry::SessionRegistry;
use crate::scrape;
use crate::session::SessionFactory;
use crate::store::StateStore;
use crate::types::{Platform, PublishJob, PublishOutcome, SessionKind};
use crate::workflow;

/// How the request resolved; drives HTTP status mapping without leaking
/// into the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
	Ok,
	Cancelled,
	AuthRequired,
	Failure,
}

/// Result record returned for every control-surface operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
	pub success: bool,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(skip)]
	pub kind: ResponseKind,
}

impl ControlResponse {
	fn ok(message: String, url: Option<String>) -> Self {
		Self { success: true, message, url, kind: ResponseKind::Ok }
	}

	fn from_error(err: &EngineError) -> Self {
		let kind = match err {
			EngineError::Cancelled { .. } => ResponseKind::Cancelled,
			EngineError::AuthenticationRequired { .. } => ResponseKind::AuthRequired,
			_ => ResponseKind::Failure,
		};
		Self {
			success: false,
			message: err.to_string(),
			url: None,
			kind,
		}
	}
}

/// Tunables for the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
	/// Whether publish sessions run headless. Login sessions are always
	/// headful; a person completes them.
	pub headless: bool,
	pub login: LoginConfig,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self { headless: true, login: LoginConfig::default() }
	}
}

/// The engine's public service boundary.
pub struct PublishService<S> {
	registry: Arc<SessionRegistry>,
	store: Arc<dyn StateStore>,
	factory: S,
	config: ServiceConfig,
}

impl<S: SessionFactory> PublishService<S> {
	pub fn new(store: Arc<dyn StateStore>, factory: S, config: ServiceConfig) -> Self {
		Self {
			registry: Arc::new(SessionRegistry::new()),
			store,
			factory,
			config,
		}
	}

	pub fn registry(&self) -> &SessionRegistry {
		&self.registry
	}

	/// Opens a headful session and captures credentials once a person has
	/// completed the platform's login form.
	pub async fn login(&self, platform: Platform, request_id: &str) -> ControlResponse {
		info!(target = "xpub.service", platform = %platform, request_id, "login requested");

		let result = self
			.with_session(platform, request_id, SessionKind::Login, false, |driver| async move {
				let spec = platform.spec();
				let actions = Actions::new(driver.as_ref(), &self.registry, request_id, ActionConfig::for_spec(spec));

				login::await_interactive_login(&actions, spec, &self.config.login).await?;

				let cookies = actions.read_cookies().await?;
				self.store.save_credentials(platform, &cookies)?;

				// Opportunistic first scrape while the session is warm.
				let items = scrape::scrape_items(&actions, spec).await;
				if !items.is_empty() {
					self.store.save_items(platform, &items)?;
				}

				Ok(PublishOutcome { message: format!("{platform} login captured ({} cookies)", cookies.len()), url: None })
			})
			.await;

		respond(result)
	}

	/// Runs one publish job to completion or failure.
	pub async fn publish(&self, platform: Platform, job: PublishJob) -> ControlResponse {
		info!(target = "xpub.service", platform = %platform, request_id = %job.request_id, title = %job.title, "publish requested");

		// No credentials means no session: fail before opening a browser.
		match self.store.load_credentials(platform) {
			Ok(Some(_)) => {}
			Ok(None) => return ControlResponse::from_error(&EngineError::AuthenticationRequired { platform }),
			Err(err) => return ControlResponse::from_error(&err),
		}

		let request_id = job.request_id.clone();
		let rid = request_id.clone();
		let result = self
			.with_session(platform, &request_id, SessionKind::Publish, self.config.headless, |driver| async move {
				let spec = platform.spec();
				let actions = Actions::new(driver.as_ref(), &self.registry, &rid, ActionConfig::for_spec(spec));
				workflow::run_publish(&actions, spec, self.store.as_ref(), &job).await
			})
			.await;

		respond(result)
	}

	/// Best-effort forcible teardown of a request's session. Idempotent.
	pub fn terminate(&self, request_id: &str) -> ControlResponse {
		let existed = self.registry.terminate(request_id);
		let message = if existed {
			format!("session for request {request_id} terminated")
		} else {
			format!("no active session for request {request_id}")
		};
		ControlResponse::ok(message, None)
	}

	/// Allocates, registers, runs, and always releases one session.
	async fn with_session<'a, F, Fut>(
		&'a self,
		platform: Platform,
		request_id: &'a str,
		kind: SessionKind,
		headless: bool,
		run: F,
	) -> Result<PublishOutcome>
	where
		F: FnOnce(Arc<dyn PageDriver>) -> Fut,
		Fut: std::future::Future<Output = Result<PublishOutcome>> + 'a,
	{
		let mut session = self.factory.open(platform, headless).await?;
		let pid = session.pid();
		self.registry.register(request_id, platform, kind, session.take_process(), pid);

		let result = run(session.driver()).await;

		// Guaranteed cleanup: graceful close first, then the registry
		// reaps whatever is left and frees the identifier.
		session.close().await;
		self.registry.release(request_id);

		if let Err(err) = &result {
			if err.is_cancelled() {
				info!(target = "xpub.service", request_id, "request cancelled");
			} else {
				warn!(target = "xpub.service", request_id, error = %err, "request failed");
			}
		}
		result
	}
}

fn respond(result: Result<PublishOutcome>) -> ControlResponse {
	match result {
		Ok(outcome) => ControlResponse::ok(outcome.message, outcome.url),
		Err(err) => ControlResponse::from_error(&err),
	}
}

/// Clamp applied to pathological login deadlines from configuration.
pub fn clamp_login_deadline(requested: Duration) -> Duration {
	requested.clamp(Duration::from_secs(30), Duration::from_secs(1800))
}
