//! Concurrent session registry with idempotent, forcible termination.
//!
//! Registry membership is the single source of truth for whether a request
//! is still live: every retry loop in the action layer consults
//! [`SessionRegistry::is_active`] before retrying. Termination kills the
//! underlying browser process because nothing else can interrupt a browser
//! call already in flight.

use std::collections::HashMap;
use std::process::Child;
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::types::{Platform, SessionKind};

struct SessionRecord {
	platform: Platform,
	kind: SessionKind,
	created_at: SystemTime,
	pid: Option<u32>,
	child: Option<Child>,
}

/// Tracks one live browser session per in-flight request id.
#[derive(Default)]
pub struct SessionRegistry {
	sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a session for `request_id`, replacing (and killing) any
	/// stale entry so at most one session exists per id.
	pub fn register(
		&self,
		request_id: &str,
		platform: Platform,
		kind: SessionKind,
		child: Option<Child>,
		pid: Option<u32>,
	) {
		let record = SessionRecord {
			platform,
			kind,
			created_at: SystemTime::now(),
			pid,
			child,
		};
		let stale = self.sessions.lock().insert(request_id.to_string(), record);
		if let Some(stale) = stale {
			warn!(target = "xpub.registry", request_id, "replacing stale session entry");
			kill_record(request_id, stale);
		}
		info!(target = "xpub.registry", request_id, platform = %platform, kind = %kind, ?pid, "session registered");
	}

	/// True while the request still owns a live session.
	pub fn is_active(&self, request_id: &str) -> bool {
		self.sessions.lock().contains_key(request_id)
	}

	/// Number of live sessions.
	pub fn active_count(&self) -> usize {
		self.sessions.lock().len()
	}

	/// Forcibly tears down the session for `request_id`.
	///
	/// Idempotent: terminating an absent or already-finished session is not
	/// an error. Kill failures are logged and swallowed; the entry is
	/// removed regardless so the identifier becomes reusable. Returns
	/// whether an entry existed.
	pub fn terminate(&self, request_id: &str) -> bool {
		let record = self.sessions.lock().remove(request_id);
		match record {
			Some(record) => {
				info!(
					target = "xpub.registry",
					request_id,
					platform = %record.platform,
					age_ms = record.created_at.elapsed().map(|d| d.as_millis() as u64).unwrap_or(0),
					"terminating session"
				);
				kill_record(request_id, record);
				true
			}
			None => {
				debug!(target = "xpub.registry", request_id, "terminate: no session registered");
				false
			}
		}
	}

	/// Normal completion cleanup. The browser has usually shut down
	/// gracefully by now; any process still alive is reaped here.
	pub fn release(&self, request_id: &str) {
		let record = self.sessions.lock().remove(request_id);
		if let Some(record) = record {
			debug!(target = "xpub.registry", request_id, kind = %record.kind, "session released");
			kill_record(request_id, record);
		}
	}
}

fn kill_record(request_id: &str, record: SessionRecord) {
	let Some(mut child) = record.child else {
		return;
	};
	match child.try_wait() {
		Ok(Some(status)) => {
			debug!(target = "xpub.registry", request_id, %status, "browser already exited");
			return;
		}
		Ok(None) => {}
		Err(err) => {
			warn!(target = "xpub.registry", request_id, error = %err, "could not poll browser process");
		}
	}
	if let Err(err) = child.kill() {
		warn!(target = "xpub.registry", request_id, pid = ?record.pid, error = %err, "failed to kill browser process");
	}
	// Reap so the pid does not linger as a zombie.
	if let Err(err) = child.wait() {
		warn!(target = "xpub.registry", request_id, error = %err, "failed to reap browser process");
	}
}
