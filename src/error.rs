//! Crate-level error types shared by the session, coordinator, and interceptor.

// self
use crate::{_prelude::*, renewal::RenewalError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shared, clonable error source.
///
/// Sources are reference-counted so a single renewal failure can be handed to every request
/// that was queued behind it.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure while dispatching an authenticated request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Renewal call failed for a reason other than an invalid refresh token.
	#[error(transparent)]
	Renewal(#[from] RenewalError),

	/// The stored credential payload is not well-formed.
	#[error("Failed to parse auth tokens: {payload}.")]
	CorruptedCredentials {
		/// Raw payload found in the store.
		payload: String,
		/// Structured parsing failure.
		#[source]
		source: SharedError,
	},
	/// An operation needs a stored session but none exists.
	#[error("Unable to {action} since there are no tokens currently stored.")]
	NoCredentials {
		/// Operation that required the session.
		action: &'static str,
	},
	/// The renewal function resolved to a value that cannot be used.
	#[error("Renewal returned an invalid result: {reason}.")]
	InvalidRenewalResult {
		/// Why the result was rejected.
		reason: String,
	},
	/// The renewal endpoint rejected the refresh token itself; both tokens were cleared.
	#[error("Got {status} on token refresh; cleared both auth tokens.")]
	RenewalCredentialInvalid {
		/// HTTP status returned by the renewal endpoint.
		status: u16,
		/// Original renewal failure.
		#[source]
		source: RenewalError,
	},
	/// The renewal cycle this request was queued behind ended without an outcome.
	#[error("Token refresh was abandoned before it completed.")]
	RefreshAbandoned,
	/// A request could not be authenticated because the token refresh failed.
	#[error("Unable to refresh access token for request due to token refresh error: {source}")]
	RequestAuthentication {
		/// Underlying refresh failure.
		#[source]
		source: Box<Error>,
	},
}
impl Error {
	/// Returns the innermost renewal failure, if this error was caused by one.
	pub fn renewal_error(&self) -> Option<&RenewalError> {
		match self {
			Self::Renewal(err) | Self::RenewalCredentialInvalid { source: err, .. } => Some(err),
			Self::RequestAuthentication { source } => source.renewal_error(),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// A credential pair contained an empty token.
	#[error("The {token} token must not be empty.")]
	EmptyToken {
		/// Which token was empty (`access` or `refresh`).
		token: &'static str,
	},
	/// A header name or value could not be applied to the request.
	#[error("Header `{name}` cannot be set on the request.")]
	InvalidHeader {
		/// Header name that was rejected.
		name: String,
		/// Underlying validation failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be built.")]
	RequestBuild {
		/// Underlying builder failure.
		#[source]
		source: SharedError,
	},
}
impl ConfigError {
	/// Wraps a header validation failure.
	pub fn invalid_header(
		name: impl Into<String>,
		src: impl 'static + Send + Sync + StdError,
	) -> Self {
		Self::InvalidHeader { name: name.into(), source: Arc::new(src) }
	}

	/// Wraps a request builder failure.
	pub fn request_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::RequestBuild { source: Arc::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_authentication_embeds_inner_message() {
		let inner = Error::from(RenewalError::new("Example error"));
		let wrapped = Error::RequestAuthentication { source: Box::new(inner) };

		assert_eq!(
			wrapped.to_string(),
			"Unable to refresh access token for request due to token refresh error: Example error"
		);
		assert_eq!(
			wrapped.renewal_error().map(|err| err.message()),
			Some("Example error"),
			"Wrapped errors should still expose the renewal failure."
		);
	}

	#[test]
	fn credential_invalid_names_status() {
		let err = Error::RenewalCredentialInvalid {
			status: 401,
			source: RenewalError::new("Unauthorized").with_status(401),
		};

		assert_eq!(err.to_string(), "Got 401 on token refresh; cleared both auth tokens.");
		assert_eq!(err.renewal_error().and_then(RenewalError::status), Some(401));
	}

	#[test]
	fn no_credentials_message_names_action() {
		let err = Error::NoCredentials { action: "update access token" };

		assert_eq!(
			err.to_string(),
			"Unable to update access token since there are no tokens currently stored."
		);
	}
}
