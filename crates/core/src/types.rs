//! Shared data model: platforms, jobs, cookies, and scraped items.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target platforms the engine carries hand-tuned strategies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
	RoyalRoad,
	ScribbleHub,
	Wattpad,
}

impl Platform {
	/// All supported platforms, in a stable order.
	pub const ALL: [Platform; 3] = [Platform::RoyalRoad, Platform::ScribbleHub, Platform::Wattpad];

	/// Stable lowercase identifier used in file names and URLs.
	pub fn as_str(&self) -> &'static str {
		match self {
			Platform::RoyalRoad => "royalroad",
			Platform::ScribbleHub => "scribblehub",
			Platform::Wattpad => "wattpad",
		}
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Platform {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"royalroad" => Ok(Platform::RoyalRoad),
			"scribblehub" => Ok(Platform::ScribbleHub),
			"wattpad" => Ok(Platform::Wattpad),
			other => Err(format!("unknown platform: {other}")),
		}
	}
}

/// Why a session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
	Login,
	Publish,
}

impl fmt::Display for SessionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionKind::Login => f.write_str("login"),
			SessionKind::Publish => f.write_str("publish"),
		}
	}
}

/// One serialized browser cookie; the persisted credential unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	pub path: String,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub http_only: bool,
	/// Expiry as seconds since epoch; absent for session cookies.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
}

/// A scraped series/story reference from a platform listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformItem {
	pub id: String,
	pub name: String,
}

/// A single publish request supplied by the authoring subsystem.
///
/// Transient; never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishJob {
	pub title: String,
	/// Rich HTML markup for the chapter body.
	pub content: String,
	/// Local folder name resolved against the platform's series list.
	pub folder_name: String,
	#[serde(default)]
	pub tags: Vec<String>,
	/// Platform-specific option bag, passed through untouched.
	#[serde(default)]
	pub options: serde_json::Map<String, serde_json::Value>,
	pub request_id: String,
}

/// Successful workflow result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}
