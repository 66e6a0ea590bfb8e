//! Folder-name resolution against the scraped series list.
//!
//! Strategy order is load-bearing for callers: exact match, then
//! word-overlap fuzzy match, then one cache refresh and a second pass,
//! then a deterministic fallback to the first cached item, then give up.

use std::future::Future;

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::types::PlatformItem;

/// Minimum fraction of folder words that must appear in an item name.
const FUZZY_THRESHOLD: f64 = 0.5;

/// How a folder name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
	Exact,
	Fuzzy,
	/// No item qualified; the first cached item was chosen as the known,
	/// deterministic fallback. Not a real match.
	FirstFallback,
}

/// A resolved folder name.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderMatch {
	pub item: PlatformItem,
	pub kind: MatchKind,
}

/// Lowercases, strips punctuation outside `[A-Za-z0-9: -]`, and trims.
pub fn normalize(name: &str) -> String {
	name.to_lowercase()
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | ' ' | '-'))
		.collect::<String>()
		.trim()
		.to_string()
}

/// Words of a normalized name. Colons survive normalization stuck to the
/// word they follow, so they are trimmed at word edges before comparison.
fn words(norm: &str) -> Vec<&str> {
	norm.split_whitespace()
		.map(|w| w.trim_matches(':'))
		.filter(|w| !w.is_empty())
		.collect()
}

/// Fraction of folder words present as whole words in the item name.
fn overlap_ratio(folder_words: &[&str], item_words: &[&str]) -> f64 {
	if folder_words.is_empty() {
		return 0.0;
	}
	let matching = folder_words.iter().filter(|w| item_words.contains(w)).count();
	matching as f64 / folder_words.len() as f64
}

/// One exact-then-fuzzy pass over `items`; ties go to the first scraped item.
fn match_once(folder_norm: &str, items: &[PlatformItem]) -> Option<FolderMatch> {
	for item in items {
		if normalize(&item.name) == folder_norm {
			return Some(FolderMatch { item: item.clone(), kind: MatchKind::Exact });
		}
	}

	let folder_words = words(folder_norm);
	for item in items {
		let item_norm = normalize(&item.name);
		let ratio = overlap_ratio(&folder_words, &words(&item_norm));
		if ratio >= FUZZY_THRESHOLD {
			debug!(target = "xpub.matcher", item = %item.name, ratio, "fuzzy match");
			return Some(FolderMatch { item: item.clone(), kind: MatchKind::Fuzzy });
		}
	}

	None
}

/// Resolves `folder` against the cached items, refreshing the cache once
/// through `refresh` when the first pass finds nothing.
pub async fn resolve_folder<F, Fut>(folder: &str, cached: Vec<PlatformItem>, refresh: F) -> Result<FolderMatch>
where
	F: FnOnce() -> Fut,
	Fut: Future<Output = Vec<PlatformItem>>,
{
	let folder_norm = normalize(folder);

	if let Some(found) = match_once(&folder_norm, &cached) {
		return Ok(found);
	}

	// The cache may simply be stale; refresh once and try again.
	debug!(target = "xpub.matcher", folder = %folder, "no match in cache; refreshing");
	let refreshed = refresh().await;
	let items = if refreshed.is_empty() { cached } else { refreshed };

	if let Some(found) = match_once(&folder_norm, &items) {
		return Ok(found);
	}

	match items.first() {
		Some(first) => {
			info!(target = "xpub.matcher", folder = %folder, fallback = %first.name, "no match; falling back to first item");
			Ok(FolderMatch { item: first.clone(), kind: MatchKind::FirstFallback })
		}
		None => Err(EngineError::NoMatchFound { folder: folder.to_string() }),
	}
}
