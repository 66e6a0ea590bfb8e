//! HTTP control surface: one daemon instance drives one platform.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::info;
use xpub::{ControlResponse, Platform, PublishJob, PublishService, ResponseKind, SessionFactory};

pub struct AppState<S: SessionFactory> {
	pub service: Arc<PublishService<S>>,
	pub platform: Platform,
}

impl<S: SessionFactory> Clone for AppState<S> {
	fn clone(&self) -> Self {
		Self { service: Arc::clone(&self.service), platform: self.platform }
	}
}

pub fn router<S: SessionFactory + 'static>(state: AppState<S>) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/login", get(login::<S>))
		.route("/publish", post(publish::<S>))
		.route("/terminate", post(terminate::<S>))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
	pub request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateRequest {
	pub request_id: String,
}

async fn health() -> &'static str {
	"ok"
}

async fn login<S: SessionFactory + 'static>(
	State(state): State<AppState<S>>,
	Query(params): Query<LoginParams>,
) -> (StatusCode, Json<ControlResponse>) {
	let response = state.service.login(state.platform, &params.request_id).await;
	(status_for(&response), Json(response))
}

async fn publish<S: SessionFactory + 'static>(
	State(state): State<AppState<S>>,
	Json(job): Json<PublishJob>,
) -> (StatusCode, Json<ControlResponse>) {
	let response = state.service.publish(state.platform, job).await;
	(status_for(&response), Json(response))
}

async fn terminate<S: SessionFactory + 'static>(
	State(state): State<AppState<S>>,
	Json(req): Json<TerminateRequest>,
) -> (StatusCode, Json<ControlResponse>) {
	info!(target = "xpub.http", request_id = %req.request_id, "terminate requested");
	let response = state.service.terminate(&req.request_id);
	(status_for(&response), Json(response))
}

/// Cancellations and missing credentials are client-correctable; everything
/// else that fails is a server-side fault.
fn status_for(response: &ControlResponse) -> StatusCode {
	match response.kind {
		ResponseKind::Ok => StatusCode::OK,
		ResponseKind::Cancelled | ResponseKind::AuthRequired => StatusCode::BAD_REQUEST,
		ResponseKind::Failure => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn response(kind: ResponseKind) -> ControlResponse {
		ControlResponse {
			success: kind == ResponseKind::Ok,
			message: String::new(),
			url: None,
			kind,
		}
	}

	#[test]
	fn status_mapping() {
		assert_eq!(status_for(&response(ResponseKind::Ok)), StatusCode::OK);
		assert_eq!(status_for(&response(ResponseKind::Cancelled)), StatusCode::BAD_REQUEST);
		assert_eq!(status_for(&response(ResponseKind::AuthRequired)), StatusCode::BAD_REQUEST);
		assert_eq!(status_for(&response(ResponseKind::Failure)), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn request_payloads_use_camel_case() {
		let term: TerminateRequest = serde_json::from_str(r#"{"requestId":"abc"}"#).unwrap();
		assert_eq!(term.request_id, "abc");

		let job: PublishJob = serde_json::from_str(
			r#"{"title":"Ch 1","content":"<p>x</p>","folderName":"My Story","tags":["fantasy"],"options":{},"requestId":"r1"}"#,
		)
		.unwrap();
		assert_eq!(job.folder_name, "My Story");
		assert_eq!(job.request_id, "r1");
	}
}
