//! Generic publish workflow, parameterized by a platform strategy.
//!
//! One engine drives every platform through the same abstract states:
//! `Idle → Authenticated → ComposerOpen → TitleSet → ContentInjected →
//! Submitted → Confirmed`. A cancellation check runs between every state
//! transition, not only inside action retries, so a terminate issued
//! between two successful steps still halts promptly. A failed transition
//! is terminal for the request; no state is ever retried wholesale.

use std::fmt;

use tracing::{debug, error, info};

use crate::action::Actions;
use crate::error::{EngineError, Result};
use crate::matcher::{self, MatchKind};
use crate::platform::PlatformSpec;
use crate::scrape;
use crate::store::StateStore;
use crate::types::{PublishJob, PublishOutcome};

/// Abstract workflow states, shared across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
	Idle,
	Authenticated,
	ComposerOpen,
	TitleSet,
	ContentInjected,
	Submitted,
	Confirmed,
}

impl fmt::Display for PublishStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			PublishStep::Idle => "idle",
			PublishStep::Authenticated => "authenticated",
			PublishStep::ComposerOpen => "composer-open",
			PublishStep::TitleSet => "title-set",
			PublishStep::ContentInjected => "content-injected",
			PublishStep::Submitted => "submitted",
			PublishStep::Confirmed => "confirmed",
		};
		f.write_str(name)
	}
}

struct StepTracker<'a> {
	actions: &'a Actions<'a>,
	current: PublishStep,
}

impl<'a> StepTracker<'a> {
	fn new(actions: &'a Actions<'a>) -> Self {
		Self { actions, current: PublishStep::Idle }
	}

	/// Cancellation gate between states.
	fn advance(&mut self, next: PublishStep) -> Result<()> {
		self.actions.ensure_active()?;
		debug!(target = "xpub.workflow", from = %self.current, to = %next, "state transition");
		self.current = next;
		Ok(())
	}
}

/// Runs one publish job to completion inside an already-open session.
///
/// The caller owns session allocation, registration, and release; this
/// function owns everything between `Idle` and `Confirmed`.
pub async fn run_publish(
	actions: &Actions<'_>,
	spec: &PlatformSpec,
	store: &dyn StateStore,
	job: &PublishJob,
) -> Result<PublishOutcome> {
	let platform = spec.platform;
	info!(
		target = "xpub.workflow",
		platform = %platform,
		request_id = %job.request_id,
		title = %job.title,
		folder = %job.folder_name,
		"publish: start"
	);

	let result = drive(actions, spec, store, job).await;
	match &result {
		Ok(outcome) => {
			info!(target = "xpub.workflow", platform = %platform, request_id = %job.request_id, message = %outcome.message, "publish: done");
		}
		Err(err) if err.is_cancelled() => {
			info!(target = "xpub.workflow", platform = %platform, request_id = %job.request_id, "publish: cancelled");
		}
		Err(err) => {
			error!(target = "xpub.workflow", platform = %platform, request_id = %job.request_id, error = %err, "publish: failed");
		}
	}
	result
}

async fn drive(actions: &Actions<'_>, spec: &PlatformSpec, store: &dyn StateStore, job: &PublishJob) -> Result<PublishOutcome> {
	let platform = spec.platform;
	let mut tracker = StepTracker::new(actions);

	// Idle -> Authenticated: the persisted credential set is the sole
	// bearer of authentication.
	let cookies = store
		.load_credentials(platform)?
		.ok_or(EngineError::AuthenticationRequired { platform })?;
	actions.set_cookies(cookies).await?;
	tracker.advance(PublishStep::Authenticated)?;

	// Resolve the target series before touching the composer; its id is
	// part of the composer URL.
	let cached = store.load_items(platform)?;
	let matched = matcher::resolve_folder(&job.folder_name, cached, || async {
		let fresh = scrape::scrape_items(actions, spec).await;
		if !fresh.is_empty() {
			if let Err(err) = store.save_items(platform, &fresh) {
				debug!(target = "xpub.workflow", platform = %platform, error = %err, "series cache refresh not persisted");
			}
		}
		fresh
	})
	.await?;
	if matched.kind == MatchKind::FirstFallback {
		info!(
			target = "xpub.workflow",
			platform = %platform,
			folder = %job.folder_name,
			chosen = %matched.item.name,
			"folder did not match; publishing into first series as fallback"
		);
	}

	// Authenticated -> ComposerOpen
	actions.navigate(&spec.composer_url_for(&matched.item.id)).await?;
	actions.wait_for_element(spec.title_selector).await?;
	tracker.advance(PublishStep::ComposerOpen)?;

	// ComposerOpen -> TitleSet
	actions.type_text(spec.title_selector, &job.title).await?;
	tracker.advance(PublishStep::TitleSet)?;

	// TitleSet -> ContentInjected
	actions.inject_content(spec, &job.content).await?;
	tracker.advance(PublishStep::ContentInjected)?;

	if let Some(tags_selector) = spec.tags_selector {
		if !job.tags.is_empty() {
			actions.wait_for_element(tags_selector).await?;
			actions.type_text(tags_selector, &job.tags.join(", ")).await?;
		}
	}

	// ContentInjected -> Submitted: possibly a multi-click confirmation
	// sequence, clicked strictly in order.
	for selector in spec.submit_selectors {
		actions.wait_for_element(selector).await?;
		actions.click(selector).await?;
	}
	tracker.advance(PublishStep::Submitted)?;

	// Submitted -> Confirmed
	actions
		.wait_for_element(spec.published_selector)
		.await
		.map_err(|err| match err {
			EngineError::SelectorTimeout { .. } => EngineError::Submission {
				platform,
				detail: "no confirmation signal appeared after submit".to_string(),
			},
			other => other,
		})?;
	tracker.advance(PublishStep::Confirmed)?;

	let url = actions.current_url().await;
	let message = match matched.kind {
		MatchKind::FirstFallback => format!(
			"Published {:?} to {platform} under {:?} (fallback: folder {:?} had no match)",
			job.title, matched.item.name, job.folder_name
		),
		_ => format!("Published {:?} to {platform} under {:?}", job.title, matched.item.name),
	};
	Ok(PublishOutcome { message, url })
}
