//! Bearer-token interceptor for HTTP clients: attach the current access token to every outgoing
//! request, renew it exactly once when it is about to expire, and queue every request that
//! arrives while that renewal is in flight.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
#[cfg(feature = "reqwest")] pub mod http;
pub mod interceptor;
pub mod obs;
pub mod refresh;
pub mod renewal;
pub mod session;
pub mod store;

#[cfg(test)]
mod _preludet {
	//! Fixtures shared by the crate's unit tests.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		auth::{AppId, EnvironmentId},
		session::{AccessTokenPlacement, Session},
		store::{MemoryStore, StorageKey},
	};

	/// Builds an unsigned JWT whose `exp` claim lies `ttl` away from now.
	pub fn jwt_expiring_in(ttl: Duration) -> String {
		let exp = (OffsetDateTime::now_utc() + ttl).unix_timestamp();

		jwt_with_payload(&format!("{{\"exp\":{exp},\"sub\":\"user-1\"}}"))
	}

	/// Builds an unsigned JWT carrying the provided JSON payload.
	pub fn jwt_with_payload(payload: &str) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());

		format!("{header}.{body}.signature")
	}

	/// Storage key used across unit tests.
	pub fn test_storage_key() -> StorageKey {
		let app = AppId::new("com.example.app").expect("Test app identifier should be valid.");
		let env = EnvironmentId::new("test").expect("Test environment identifier should be valid.");

		StorageKey::new(&app, &env)
	}

	/// Creates a session backed by a fresh in-memory store.
	pub fn memory_session(placement: AccessTokenPlacement) -> (Arc<Session>, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let session = Session::new(store.clone(), test_storage_key()).with_placement(placement);

		(Arc::new(session), store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(test)] use {color_eyre as _, httpmock as _};
