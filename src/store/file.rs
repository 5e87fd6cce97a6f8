//! File-backed [`CredentialStore`] for desktop tools and bots without an OS keychain.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StorageKey, StoreError, StoreFuture},
};

/// Persists every payload to a JSON file after each mutation.
///
/// Writes go to a sibling `.tmp` file which is synced and renamed over the snapshot, so readers
/// of the file see either the previous snapshot or the new one.
///
/// Writes are blocking filesystem calls made on the polling thread.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<StorageKey, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<StorageKey, String>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(BTreeMap::new());
		}

		let mut de = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &BTreeMap<StorageKey, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	// The in-memory map only changes once the snapshot hit the disk.
	fn mutate(
		&self,
		apply: impl FnOnce(&mut BTreeMap<StorageKey, String>) -> bool,
	) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		if !apply(&mut next) {
			return Ok(());
		}

		self.persist(&next)?;
		*guard = next;

		Ok(())
	}
}
impl CredentialStore for FileStore {
	fn load<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn save<'a>(&'a self, key: &'a StorageKey, payload: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.mutate(|map| {
				map.insert(key.to_owned(), payload);

				true
			})
		})
	}

	fn remove<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.mutate(|map| map.remove(key).is_some()) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::_preludet::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"bearer_refresh_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let key = test_storage_key();

		store.save(&key, "payload".into()).await.expect("Failed to save payload to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened.load(&key).await.expect("Failed to load payload from file store.");

		assert_eq!(fetched.as_deref(), Some("payload"));

		reopened.remove(&key).await.expect("Failed to remove payload from file store.");

		let emptied = FileStore::open(&path).expect("Failed to reopen emptied snapshot.");

		assert_eq!(emptied.load(&key).await.expect("Load should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupted_snapshot_is_reported() {
		let path = temp_path("corrupted");

		fs::write(&path, b"totallynotjson").expect("Failed to seed corrupted snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupted snapshots must not load as empty.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn empty_file_loads_as_empty_store() {
		let path = temp_path("empty");

		fs::write(&path, b"").expect("Failed to seed empty snapshot.");

		let store = FileStore::open(&path).expect("Empty snapshot should open.");

		assert!(store.inner.read().is_empty());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
