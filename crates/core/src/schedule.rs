//! Scheduled-publication records and the executor that drains them.
//!
//! Records are created and persisted by the scheduling collaborator; the
//! engine only executes the due ones through the same publish workflow and
//! reports the resulting status transitions back for the caller to persist.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::types::{Platform, PublishOutcome};

/// Lifecycle of a scheduled publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
	Scheduled,
	Published,
	Cancelled,
	Failed,
}

/// One deferred publish request owned by the scheduling collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPublication {
	pub id: String,
	pub platform: Platform,
	/// Caller-side reference to the draft being published.
	pub draft_reference: String,
	/// Seconds since epoch.
	pub scheduled_time: u64,
	pub status: PublicationStatus,
	#[serde(default)]
	pub attempt_count: u32,
}

impl ScheduledPublication {
	pub fn is_due(&self, now: u64) -> bool {
		self.status == PublicationStatus::Scheduled && self.scheduled_time <= now
	}
}

/// Executes every due record through `publish`, updating status and attempt
/// count in place. Returns how many records were attempted.
///
/// A cancelled publish marks the record `cancelled`, any other failure
/// marks it `failed`; neither aborts the sweep.
pub async fn run_due<F, Fut>(records: &mut [ScheduledPublication], now: u64, mut publish: F) -> usize
where
	F: FnMut(ScheduledPublication) -> Fut,
	Fut: Future<Output = Result<PublishOutcome>>,
{
	let mut attempted = 0;
	for record in records.iter_mut() {
		if !record.is_due(now) {
			continue;
		}
		attempted += 1;
		record.attempt_count += 1;
		match publish(record.clone()).await {
			Ok(outcome) => {
				info!(target = "xpub.schedule", id = %record.id, message = %outcome.message, "scheduled publication done");
				record.status = PublicationStatus::Published;
			}
			Err(err) if err.is_cancelled() => {
				info!(target = "xpub.schedule", id = %record.id, "scheduled publication cancelled");
				record.status = PublicationStatus::Cancelled;
			}
			Err(err) => {
				info!(target = "xpub.schedule", id = %record.id, error = %err, "scheduled publication failed");
				record.status = PublicationStatus::Failed;
			}
		}
	}
	attempted
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::EngineError;

	fn record(id: &str, time: u64) -> ScheduledPublication {
		ScheduledPublication {
			id: id.into(),
			platform: Platform::RoyalRoad,
			draft_reference: format!("draft-{id}"),
			scheduled_time: time,
			status: PublicationStatus::Scheduled,
			attempt_count: 0,
		}
	}

	#[test]
	fn due_only_while_scheduled_and_past_time() {
		let mut r = record("a", 100);
		assert!(!r.is_due(99));
		assert!(r.is_due(100));
		r.status = PublicationStatus::Published;
		assert!(!r.is_due(100));
	}

	#[tokio::test]
	async fn run_due_transitions_each_outcome_kind() {
		let mut records = vec![record("ok", 10), record("cancelled", 10), record("failed", 10), record("future", 10_000)];

		let attempted = run_due(&mut records, 100, |r| async move {
			match r.id.as_str() {
				"ok" => Ok(PublishOutcome { message: "done".into(), url: None }),
				"cancelled" => Err(EngineError::Cancelled { request_id: r.id }),
				_ => Err(EngineError::NoMatchFound { folder: "x".into() }),
			}
		})
		.await;

		assert_eq!(attempted, 3);
		assert_eq!(records[0].status, PublicationStatus::Published);
		assert_eq!(records[1].status, PublicationStatus::Cancelled);
		assert_eq!(records[2].status, PublicationStatus::Failed);
		assert_eq!(records[3].status, PublicationStatus::Scheduled);
		assert_eq!(records[3].attempt_count, 0);
		assert!(records[..3].iter().all(|r| r.attempt_count == 1));
	}

	#[test]
	fn serializes_camel_case_for_collaborators() {
		let json = serde_json::to_value(record("a", 42)).unwrap();
		assert_eq!(json["draftReference"], "draft-a");
		assert_eq!(json["scheduledTime"], 42);
		assert_eq!(json["status"], "scheduled");
	}
}
