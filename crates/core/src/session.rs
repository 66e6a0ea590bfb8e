//! Browser session launch and the factory seam the service runs against.
//!
//! Every request gets its own Chromium OS process: the executable is
//! discovered, launched with a private user-data dir and an ephemeral
//! remote-debugging port, the CDP endpoint is probed over `/json/version`,
//! and the engine attaches with chromiumoxide. The child process handle is
//! surrendered to the registry, which is the only component allowed to kill
//! it.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Browser;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::driver::{CdpDriver, PageDriver};
use crate::error::{EngineError, Result};
use crate::types::Platform;

const ENDPOINT_PROBE_ATTEMPTS: u32 = 10;
const ENDPOINT_PROBE_PAUSE: Duration = Duration::from_millis(200);

/// One live browser session.
#[async_trait]
pub trait SessionHandle: Send {
	/// Driver for the session's page.
	fn driver(&self) -> Arc<dyn PageDriver>;

	/// Surrenders the OS process handle (once) so the registry can kill it.
	fn take_process(&mut self) -> Option<Child>;

	fn pid(&self) -> Option<u32>;

	/// Best-effort graceful shutdown; the registry reaps anything left.
	async fn close(self: Box<Self>);
}

/// Opens sessions; the production impl launches real browsers, tests
/// substitute scripted fakes.
#[async_trait]
pub trait SessionFactory: Send + Sync {
	async fn open(&self, platform: Platform, headless: bool) -> Result<Box<dyn SessionHandle>>;
}

/// `/json/version` response subset from the DevTools endpoint.
#[derive(Debug, Deserialize)]
struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	web_socket_debugger_url: String,
}

struct CdpSession {
	browser: Browser,
	handler_task: JoinHandle<()>,
	driver: Arc<CdpDriver>,
	child: Option<Child>,
	pid: u32,
}

#[async_trait]
impl SessionHandle for CdpSession {
	fn driver(&self) -> Arc<dyn PageDriver> {
		Arc::clone(&self.driver) as Arc<dyn PageDriver>
	}

	fn take_process(&mut self) -> Option<Child> {
		self.child.take()
	}

	fn pid(&self) -> Option<u32> {
		Some(self.pid)
	}

	async fn close(mut self: Box<Self>) {
		if let Err(err) = self.browser.close().await {
			debug!(target = "xpub.session", error = %err, "browser close failed; registry will reap the process");
		}
		self.handler_task.abort();
	}
}

/// Launches one Chromium process per opened session.
#[derive(Debug, Default)]
pub struct CdpSessionFactory;

impl CdpSessionFactory {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
	async fn open(&self, platform: Platform, headless: bool) -> Result<Box<dyn SessionHandle>> {
		let port = pick_free_port()?;
		let mut child = spawn_browser(platform, port, headless)?;
		let pid = child.id();

		let info = match probe_endpoint(&mut child, port).await {
			Ok(info) => info,
			Err(err) => {
				// The process is useless without its endpoint; reap it here
				// since it never reaches the registry.
				let _ = child.kill();
				let _ = child.wait();
				return Err(err);
			}
		};

		debug!(target = "xpub.session", platform = %platform, port, pid, "attaching over cdp");
		let (browser, mut handler) = Browser::connect(info.web_socket_debugger_url)
			.await
			.map_err(|e| EngineError::BrowserLaunch(format!("CDP attach failed: {e}")))?;

		let handler_task = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if event.is_err() {
					break;
				}
			}
		});

		let page = browser
			.new_page("about:blank")
			.await
			.map_err(|e| EngineError::BrowserLaunch(format!("failed to open page: {e}")))?;

		Ok(Box::new(CdpSession {
			browser,
			handler_task,
			driver: Arc::new(CdpDriver::new(page)),
			child: Some(child),
			pid,
		}))
	}
}

fn pick_free_port() -> Result<u16> {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}

fn spawn_browser(platform: Platform, port: u16, headless: bool) -> Result<Child> {
	let executable = find_browser_executable().ok_or_else(|| {
		EngineError::BrowserLaunch("could not find a Chrome/Chromium executable; install one or put it on PATH".to_string())
	})?;

	let user_data_dir = session_data_dir(platform, port);
	std::fs::create_dir_all(&user_data_dir)?;

	let mut args = vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", user_data_dir.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
	];
	if headless {
		args.push("--headless=new".to_string());
	}

	let mut cmd = Command::new(&executable);
	cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

	let child = cmd
		.spawn()
		.map_err(|e| EngineError::BrowserLaunch(format!("failed to launch {executable}: {e}")))?;

	debug!(target = "xpub.session", platform = %platform, pid = child.id(), port, headless, "browser process spawned");
	Ok(child)
}

fn session_data_dir(platform: Platform, port: u16) -> PathBuf {
	std::env::temp_dir().join(format!("xpub-{platform}-{port}"))
}

fn find_browser_executable() -> Option<String> {
	let candidates: Vec<String> = if cfg!(target_os = "macos") {
		vec![
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else {
		vec![
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	};

	for candidate in candidates {
		if candidate.starts_with('/') {
			if std::path::Path::new(&candidate).exists() {
				return Some(candidate);
			}
		} else if which::which(&candidate).is_ok() {
			return Some(candidate);
		}
	}

	None
}

async fn probe_endpoint(child: &mut Child, port: u16) -> Result<CdpVersionInfo> {
	let client = reqwest::Client::builder()
		.timeout(Duration::from_millis(400))
		.build()
		.map_err(|e| EngineError::BrowserLaunch(format!("failed to create HTTP client: {e}")))?;

	let url = format!("http://127.0.0.1:{port}/json/version");
	let mut last_error = "endpoint not reachable".to_string();

	for _ in 0..ENDPOINT_PROBE_ATTEMPTS {
		tokio::time::sleep(ENDPOINT_PROBE_PAUSE).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(EngineError::BrowserLaunch(format!(
				"browser exited before its debugging endpoint became available (status: {status})"
			)));
		}

		match client.get(&url).send().await {
			Ok(response) if response.status().is_success() => {
				return response
					.json::<CdpVersionInfo>()
					.await
					.map_err(|e| EngineError::BrowserLaunch(format!("failed to parse CDP version response: {e}")));
			}
			Ok(response) => {
				last_error = format!("unexpected status {}", response.status());
			}
			Err(err) => {
				last_error = err.to_string();
			}
		}
	}

	warn!(target = "xpub.session", port, error = %last_error, "debugging endpoint never came up");
	Err(EngineError::BrowserLaunch(format!(
		"debugging endpoint not available on port {port}: {last_error}"
	)))
}
