//! Session state: the credential pair behind a single login.
//!
//! A [`Session`] binds a [`CredentialStore`] to one [`StorageKey`] and owns every write to the
//! credential pair. Where the access token lives is a deployment choice:
//!
//! - [`AccessTokenPlacement::Memory`] keeps it in process memory only. A restart loses it and
//!   the next request renews it; a leaked store never exposes a usable access token.
//! - [`AccessTokenPlacement::Persisted`] stores it next to the refresh token, so it survives a
//!   restart at the cost of a larger exposure surface.
//!
//! Either way the refresh token is only ever persisted, and clearing it clears the access token
//! too.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CredentialStore, StorageKey, StoreError},
};

/// Where a [`Session`] keeps the access token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessTokenPlacement {
	/// In process memory, never written to the store.
	#[default]
	Memory,
	/// In the store, alongside the refresh token.
	Persisted,
}

/// Payload written to the credential store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
	/// Refresh token; its presence is what "logged in" means.
	pub refresh_token: TokenSecret,
	/// Access token, present only with [`AccessTokenPlacement::Persisted`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
}

/// Credential pair for one login, backed by a [`CredentialStore`].
pub struct Session {
	store: Arc<dyn CredentialStore>,
	key: StorageKey,
	placement: AccessTokenPlacement,
	access_token: RwLock<Option<TokenSecret>>,
	writes: AsyncMutex<()>,
}
impl Session {
	/// Creates a session that keeps the access token in memory.
	pub fn new(store: Arc<dyn CredentialStore>, key: StorageKey) -> Self {
		Self {
			store,
			key,
			placement: AccessTokenPlacement::default(),
			access_token: RwLock::new(None),
			writes: AsyncMutex::new(()),
		}
	}

	/// Overrides where the access token is kept.
	pub fn with_placement(mut self, placement: AccessTokenPlacement) -> Self {
		self.placement = placement;

		self
	}

	/// Storage key this session reads and writes.
	pub fn key(&self) -> &StorageKey {
		&self.key
	}

	/// Configured access token placement.
	pub fn placement(&self) -> AccessTokenPlacement {
		self.placement
	}

	/// Returns `true` if a refresh token is stored.
	pub async fn is_logged_in(&self) -> Result<bool> {
		Ok(self.refresh_token().await?.is_some())
	}

	/// Returns the stored refresh token.
	pub async fn refresh_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.load().await?.map(|stored| stored.refresh_token))
	}

	/// Returns the current access token.
	pub async fn access_token(&self) -> Result<Option<TokenSecret>> {
		match self.placement {
			AccessTokenPlacement::Memory => Ok(self.access_token.read().clone()),
			AccessTokenPlacement::Persisted =>
				Ok(self.load().await?.and_then(|stored| stored.access_token)),
		}
	}

	/// Stores a full credential pair, replacing whatever was there.
	pub async fn set_auth_tokens(&self, pair: CredentialPair) -> Result<()> {
		const KIND: FlowKind = FlowKind::Login;

		pair.validate()?;

		let span = FlowSpan::new(KIND, "set_auth_tokens");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let _writes = self.writes.lock().await;
				let CredentialPair { access_token, refresh_token } = pair;

				match self.placement {
					AccessTokenPlacement::Memory => {
						self.store_record(&StoredCredentials { refresh_token, access_token: None })
							.await?;

						*self.access_token.write() = Some(access_token);
					},
					AccessTokenPlacement::Persisted => {
						self.store_record(&StoredCredentials {
							refresh_token,
							access_token: Some(access_token),
						})
						.await?;
					},
				}

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Replaces only the access token.
	///
	/// Fails with [`Error::NoCredentials`] when no refresh token is stored, since there is no
	/// session to attach the token to.
	pub async fn set_access_token(&self, token: TokenSecret) -> Result<()> {
		if token.is_empty() {
			return Err(ConfigError::EmptyToken { token: "access" }.into());
		}

		let _writes = self.writes.lock().await;
		let stored =
			self.load().await?.ok_or(Error::NoCredentials { action: "update access token" })?;

		match self.placement {
			AccessTokenPlacement::Memory => *self.access_token.write() = Some(token),
			AccessTokenPlacement::Persisted =>
				self.store_record(&StoredCredentials { access_token: Some(token), ..stored })
					.await?,
		}

		Ok(())
	}

	/// Clears both tokens.
	pub async fn clear_auth_tokens(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "clear_auth_tokens");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let _writes = self.writes.lock().await;

				*self.access_token.write() = None;
				self.store.remove(&self.key).await?;

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn load(&self) -> Result<Option<StoredCredentials>> {
		let Some(payload) = self.store.load(&self.key).await? else {
			return Ok(None);
		};

		decode(payload).map(Some)
	}

	async fn store_record(&self, record: &StoredCredentials) -> Result<()> {
		let payload = serde_json::to_string(record).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode auth tokens: {e}"),
		})?;

		self.store.save(&self.key, payload).await?;

		Ok(())
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("key", &self.key)
			.field("placement", &self.placement)
			.field("access_token_cached", &self.access_token.read().is_some())
			.finish()
	}
}

fn decode(payload: String) -> Result<StoredCredentials> {
	let parsed = {
		let mut de = serde_json::Deserializer::from_str(&payload);

		serde_path_to_error::deserialize::<_, StoredCredentials>(&mut de)
	};

	match parsed {
		Ok(stored) if !stored.refresh_token.is_empty() => Ok(stored),
		Ok(_) => Err(Error::CorruptedCredentials {
			source: Arc::new(ConfigError::EmptyToken { token: "refresh" }),
			payload,
		}),
		Err(e) => Err(Error::CorruptedCredentials { source: Arc::new(e), payload }),
	}
}
