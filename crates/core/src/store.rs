//! Durable per-platform state: credentials and scraped metadata.
//!
//! Files are read-then-overwritten with no transactional protection;
//! concurrent logins or scrapes for the same platform race and the last
//! writer wins. The [`StateStore`] trait keeps workflow logic unaware of
//! that, so a locking store can replace [`FileStore`] later.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::{Platform, PlatformItem, StoredCookie};

const STORE_SCHEMA_VERSION: u32 = 1;

/// Persistence seam between the engine and durable storage.
pub trait StateStore: Send + Sync {
	/// Overwrites the credential set for a platform.
	fn save_credentials(&self, platform: Platform, cookies: &[StoredCookie]) -> Result<()>;

	/// Loads the credential set; `None` means the platform is not logged in.
	fn load_credentials(&self, platform: Platform) -> Result<Option<Vec<StoredCookie>>>;

	/// Overwrites the cached series list for a platform.
	fn save_items(&self, platform: Platform, items: &[PlatformItem]) -> Result<()>;

	/// Loads the cached series list; missing cache reads as empty.
	fn load_items(&self, platform: Platform) -> Result<Vec<PlatformItem>>;
}

/// On-disk envelope for the per-platform credential file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
	schema: u32,
	platform: Platform,
	saved_at: u64,
	cookies: Vec<StoredCookie>,
}

/// On-disk envelope for the per-platform metadata cache.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemCacheFile {
	schema: u32,
	platform: Platform,
	saved_at: u64,
	items: Vec<PlatformItem>,
}

/// JSON-file store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
	root: PathBuf,
}

impl FileStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Platform-default data directory, `~/.local/share/xpub` on Linux.
	pub fn default_root() -> PathBuf {
		dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("xpub")
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn credentials_path(&self, platform: Platform) -> PathBuf {
		self.root.join(platform.as_str()).join("credentials.json")
	}

	fn items_path(&self, platform: Platform) -> PathBuf {
		self.root.join(platform.as_str()).join("series-cache.json")
	}

	fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, serde_json::to_string_pretty(value)?)?;
		Ok(())
	}
}

fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl StateStore for FileStore {
	fn save_credentials(&self, platform: Platform, cookies: &[StoredCookie]) -> Result<()> {
		let path = self.credentials_path(platform);
		let file = CredentialFile {
			schema: STORE_SCHEMA_VERSION,
			platform,
			saved_at: now_ts(),
			cookies: cookies.to_vec(),
		};
		self.write_json(&path, &file)?;
		debug!(target = "xpub.store", platform = %platform, count = cookies.len(), path = %path.display(), "credentials saved");
		Ok(())
	}

	fn load_credentials(&self, platform: Platform) -> Result<Option<Vec<StoredCookie>>> {
		let path = self.credentials_path(platform);
		let raw = match fs::read_to_string(&path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		// An unreadable or empty credential file means "not logged in",
		// the same as an absent one.
		let file: CredentialFile = match serde_json::from_str(&raw) {
			Ok(file) => file,
			Err(err) => {
				debug!(target = "xpub.store", platform = %platform, error = %err, "credential file unreadable");
				return Ok(None);
			}
		};
		if file.cookies.is_empty() {
			return Ok(None);
		}
		Ok(Some(file.cookies))
	}

	fn save_items(&self, platform: Platform, items: &[PlatformItem]) -> Result<()> {
		let path = self.items_path(platform);
		let file = ItemCacheFile {
			schema: STORE_SCHEMA_VERSION,
			platform,
			saved_at: now_ts(),
			items: items.to_vec(),
		};
		self.write_json(&path, &file)?;
		debug!(target = "xpub.store", platform = %platform, count = items.len(), "series cache saved");
		Ok(())
	}

	fn load_items(&self, platform: Platform) -> Result<Vec<PlatformItem>> {
		let path = self.items_path(platform);
		let raw = match fs::read_to_string(&path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};
		let file: ItemCacheFile = match serde_json::from_str(&raw) {
			Ok(file) => file,
			Err(_) => return Ok(Vec::new()),
		};
		Ok(file.items)
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	fn cookie(name: &str) -> StoredCookie {
		StoredCookie {
			name: name.into(),
			value: "v".into(),
			domain: ".example.com".into(),
			path: "/".into(),
			secure: true,
			http_only: true,
			expires: Some(1_900_000_000.0),
		}
	}

	#[test]
	fn missing_credential_file_reads_as_not_logged_in() {
		let temp = TempDir::new().unwrap();
		let store = FileStore::new(temp.path());
		assert!(store.load_credentials(Platform::RoyalRoad).unwrap().is_none());
	}

	#[test]
	fn credentials_round_trip_and_overwrite() {
		let temp = TempDir::new().unwrap();
		let store = FileStore::new(temp.path());

		store.save_credentials(Platform::Wattpad, &[cookie("a"), cookie("b")]).unwrap();
		let loaded = store.load_credentials(Platform::Wattpad).unwrap().unwrap();
		assert_eq!(loaded.len(), 2);

		store.save_credentials(Platform::Wattpad, &[cookie("c")]).unwrap();
		let loaded = store.load_credentials(Platform::Wattpad).unwrap().unwrap();
		assert_eq!(loaded.len(), 1);
		assert_eq!(loaded[0].name, "c");
	}

	#[test]
	fn corrupt_credential_file_reads_as_not_logged_in() {
		let temp = TempDir::new().unwrap();
		let store = FileStore::new(temp.path());
		let path = temp.path().join("royalroad");
		fs::create_dir_all(&path).unwrap();
		fs::write(path.join("credentials.json"), "{not json").unwrap();
		assert!(store.load_credentials(Platform::RoyalRoad).unwrap().is_none());
	}

	#[test]
	fn item_cache_round_trips_and_defaults_empty() {
		let temp = TempDir::new().unwrap();
		let store = FileStore::new(temp.path());
		assert!(store.load_items(Platform::ScribbleHub).unwrap().is_empty());

		let items = vec![
			PlatformItem { id: "1".into(), name: "My Cool Story".into() },
			PlatformItem { id: "2".into(), name: "Other Tale".into() },
		];
		store.save_items(Platform::ScribbleHub, &items).unwrap();
		assert_eq!(store.load_items(Platform::ScribbleHub).unwrap(), items);
	}

	#[test]
	fn platforms_are_isolated_on_disk() {
		let temp = TempDir::new().unwrap();
		let store = FileStore::new(temp.path());
		store.save_credentials(Platform::RoyalRoad, &[cookie("rr")]).unwrap();
		assert!(store.load_credentials(Platform::ScribbleHub).unwrap().is_none());
	}
}
