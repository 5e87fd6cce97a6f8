//! OS keyring-backed [`CredentialStore`] (macOS Keychain, Secret Service, Credential Manager).

// crates.io
use keyring::Entry;
// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StorageKey, StoreError, StoreFuture},
};

const DEFAULT_ACCOUNT: &str = "refreshToken";

/// Keeps the payload in the platform keyring, one entry per [`StorageKey`].
///
/// The storage key is used as the keyring service name and `account` as the user name, so the
/// entry shows up as e.g. `com.example.app-refresh-token-production / refreshToken`.
#[derive(Clone, Debug)]
pub struct KeyringStore {
	account: String,
}
impl KeyringStore {
	/// Creates a store that files entries under the default `refreshToken` account.
	pub fn new() -> Self {
		Self::with_account(DEFAULT_ACCOUNT)
	}

	/// Creates a store that files entries under a custom account name.
	pub fn with_account(account: impl Into<String>) -> Self {
		Self { account: account.into() }
	}

	fn entry(&self, key: &StorageKey) -> Result<Entry, StoreError> {
		Entry::new(key.as_str(), &self.account).map_err(|e| StoreError::Backend {
			message: format!("Failed to open keyring entry {key}: {e}"),
		})
	}
}
impl Default for KeyringStore {
	fn default() -> Self {
		Self::new()
	}
}
impl CredentialStore for KeyringStore {
	fn load<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			match self.entry(key)?.get_password() {
				Ok(payload) => Ok(Some(payload)),
				Err(keyring::Error::NoEntry) => Ok(None),
				Err(e) => Err(map_keyring_error("read", key, e)),
			}
		})
	}

	fn save<'a>(&'a self, key: &'a StorageKey, payload: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.entry(key)?.set_password(&payload).map_err(|e| map_keyring_error("write", key, e))
		})
	}

	fn remove<'a>(&'a self, key: &'a StorageKey) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			match self.entry(key)?.delete_credential() {
				Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
				Err(e) => Err(map_keyring_error("clear", key, e)),
			}
		})
	}
}

fn map_keyring_error(action: &str, key: &StorageKey, err: keyring::Error) -> StoreError {
	match err {
		keyring::Error::BadEncoding(_) => StoreError::Serialization {
			message: format!("Keyring entry {key} is not valid UTF-8"),
		},
		other => StoreError::Backend {
			message: format!("Failed to {action} keyring entry {key}: {other}"),
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn bad_encoding_maps_to_serialization_error() {
		let key = test_storage_key();
		let err = map_keyring_error("read", &key, keyring::Error::BadEncoding(vec![0xff]));

		assert!(matches!(err, StoreError::Serialization { .. }));
	}

	#[test]
	fn other_failures_name_the_entry() {
		let key = test_storage_key();
		let err = map_keyring_error("write", &key, keyring::Error::NoStorageAccess("locked".into()));

		assert!(err.to_string().contains("com.example.app-refresh-token-test"));
		assert!(matches!(err, StoreError::Backend { .. }));
	}
}
