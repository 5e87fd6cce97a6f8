//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use time::{Duration, OffsetDateTime};
// self
use bearer_refresh::{
	auth::{AppId, CredentialPair, EnvironmentId, RenewedTokens, TokenSecret},
	renewal::{RenewalError, RenewalRequest},
	reqwest::Client,
	session::{AccessTokenPlacement, Session},
	store::{CredentialStore, MemoryStore, StorageKey},
};

pub const RENEW_PATH: &str = "/auth/renew";

/// Builds an unsigned JWT whose `exp` claim lies `ttl` away from now.
pub fn jwt_expiring_in(ttl: Duration) -> String {
	let exp = (OffsetDateTime::now_utc() + ttl).unix_timestamp();
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
	let body = URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}"));

	format!("{header}.{body}.signature")
}

pub fn storage_key(environment: &str) -> StorageKey {
	let app = AppId::new("com.example.app").expect("Test app identifier should be valid.");
	let env = EnvironmentId::new(environment).expect("Test environment identifier should be valid.");

	StorageKey::new(&app, &env)
}

/// Session over a fresh in-memory store, already logged in with `access` / `refresh`.
pub async fn logged_in_session(access: &str, refresh: &str) -> (Arc<Session>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let session = Arc::new(
		Session::new(store.clone() as Arc<dyn CredentialStore>, storage_key("integration"))
			.with_placement(AccessTokenPlacement::Memory),
	);

	session
		.set_auth_tokens(CredentialPair::new(access, refresh))
		.await
		.expect("Seeding the session should succeed.");

	(session, store)
}

/// Renewal call that posts the refresh token to the mock server's renewal endpoint.
///
/// The endpoint answers `{"accessToken": ...}` or `{"accessToken": ..., "refreshToken": ...}`.
pub fn http_renewal(server: &MockServer) -> Arc<dyn RenewalRequest> {
	let client = Client::new();
	let url = server.url(RENEW_PATH);

	Arc::new(move |refresh: TokenSecret| renew_over_http(client.clone(), url.clone(), refresh))
}

async fn renew_over_http(
	client: Client,
	url: String,
	refresh: TokenSecret,
) -> Result<RenewedTokens, RenewalError> {
	let body = serde_json::json!({ "refreshToken": refresh.expose() }).to_string();
	let response = client
		.post(url)
		.header("content-type", "application/json")
		.body(body)
		.send()
		.await?
		.error_for_status()?;
	let payload = response.text().await?;
	let renewed: serde_json::Value =
		serde_json::from_str(&payload).map_err(RenewalError::from_source)?;
	let access = renewed["accessToken"]
		.as_str()
		.ok_or_else(|| RenewalError::new("Renewal response is missing accessToken."))?;

	Ok(match renewed["refreshToken"].as_str() {
		Some(refresh) => CredentialPair::new(access, refresh).into(),
		None => RenewedTokens::from(access),
	})
}
