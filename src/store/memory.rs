//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StorageKey, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<StorageKey, String>>>;

/// Storage backend that keeps payloads in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored payloads.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, key: StorageKey, payload: String) -> Result<(), StoreError> {
		map.write().insert(key, payload);

		Ok(())
	}

	fn load_now(map: StoreMap, key: &StorageKey) -> Option<String> {
		map.read().get(key).cloned()
	}

	fn remove_now(map: StoreMap, key: &StorageKey) {
		map.write().remove(key);
	}
}
impl CredentialStore for MemoryStore {
	fn load<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(map, key)) })
	}

	fn save<'a>(&'a self, key: &'a StorageKey, payload: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::save_now(map, key, payload) })
	}

	fn remove<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::remove_now(map, key);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn save_load_and_remove() {
		let store = MemoryStore::default();
		let key = test_storage_key();

		assert_eq!(store.load(&key).await.expect("Load should succeed."), None);

		store.save(&key, "first".into()).await.expect("Save should succeed.");
		store.save(&key, "second".into()).await.expect("Overwrite should succeed.");

		assert_eq!(store.load(&key).await.expect("Load should succeed."), Some("second".into()));
		assert_eq!(store.len(), 1);

		store.remove(&key).await.expect("Remove should succeed.");
		store.remove(&key).await.expect("Removing a missing key should succeed.");

		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn clones_share_state() {
		let store = MemoryStore::default();
		let clone = store.clone();
		let key = test_storage_key();

		store.save(&key, "shared".into()).await.expect("Save should succeed.");

		assert_eq!(clone.load(&key).await.expect("Load should succeed."), Some("shared".into()));
	}
}
