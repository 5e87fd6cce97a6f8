//! Storage contract and built-in backends for the persisted credential payload.

pub mod file;
#[cfg(feature = "keyring")] pub mod keyring;
pub mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring")] pub use keyring::KeyringStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AppId, EnvironmentId},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// String-keyed storage backend holding one opaque payload per [`StorageKey`].
///
/// Implementations must replace a payload as a whole: after a failed `save` the previous value
/// stays readable, and a `load` following a successful `save` in the same process observes the
/// new value.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the payload stored under `key`, if present.
	fn load<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, Option<String>>;

	/// Persists or replaces the payload stored under `key`.
	fn save<'a>(&'a self, key: &'a StorageKey, payload: String) -> StoreFuture<'a, ()>;

	/// Removes the payload stored under `key`. Removing a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Storage slot derived from the application identity and deployment environment, so test,
/// staging, and production credentials never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);
impl StorageKey {
	/// Builds the `{app}-refresh-token-{environment}` key.
	pub fn new(app: &AppId, environment: &EnvironmentId) -> Self {
		Self(format!("{app}-refresh-token-{environment}"))
	}

	/// Returns the rendered key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for StorageKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
