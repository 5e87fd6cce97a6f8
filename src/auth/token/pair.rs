//! The access/refresh credential pair and the shapes a renewal may return.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Access token plus the refresh token that renews it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Short-lived token attached to outgoing requests.
	pub access_token: TokenSecret,
	/// Longer-lived token exchanged for new access tokens.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from the provided tokens.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
	}

	/// Ensures neither token is empty.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.access_token.is_empty() {
			return Err(ConfigError::EmptyToken { token: "access" });
		}
		if self.refresh_token.is_empty() {
			return Err(ConfigError::EmptyToken { token: "refresh" });
		}

		Ok(())
	}
}

/// Result of a successful renewal call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenewedTokens {
	/// Only a new access token was issued; the refresh token stays as is.
	AccessTokenOnly(TokenSecret),
	/// Both tokens were issued; the refresh token is rotated.
	FullPair(CredentialPair),
}
impl RenewedTokens {
	/// Access token carried by either variant.
	pub fn access_token(&self) -> &TokenSecret {
		match self {
			Self::AccessTokenOnly(token) => token,
			Self::FullPair(pair) => &pair.access_token,
		}
	}
}
impl From<TokenSecret> for RenewedTokens {
	fn from(value: TokenSecret) -> Self {
		Self::AccessTokenOnly(value)
	}
}
impl From<String> for RenewedTokens {
	fn from(value: String) -> Self {
		Self::AccessTokenOnly(value.into())
	}
}
impl From<&str> for RenewedTokens {
	fn from(value: &str) -> Self {
		Self::AccessTokenOnly(value.into())
	}
}
impl From<CredentialPair> for RenewedTokens {
	fn from(value: CredentialPair) -> Self {
		Self::FullPair(value)
	}
}
