//! Caller-supplied renewal call that trades a refresh token for new credentials.
//!
//! The crate never talks to a token endpoint itself. Callers implement [`RenewalRequest`] (any
//! `Fn(TokenSecret) -> impl Future<Output = Result<RenewedTokens, RenewalError>>` closure does)
//! and report failures as [`RenewalError`], tagging the HTTP status when there is one so the
//! coordinator can tell a dead refresh token from a transient outage.

// self
use crate::{
	_prelude::*,
	auth::{RenewedTokens, TokenSecret},
	error::SharedError,
};

/// Boxed future returned by [`RenewalRequest::renew`].
pub type RenewalFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RenewedTokens, RenewalError>> + 'a + Send>>;

/// Exchanges a refresh token for a new access token or a full credential pair.
pub trait RenewalRequest
where
	Self: Send + Sync,
{
	/// Performs the renewal call.
	fn renew(&self, refresh_token: TokenSecret) -> RenewalFuture<'_>;
}
impl<F, Fut> RenewalRequest for F
where
	F: Send + Sync + Fn(TokenSecret) -> Fut,
	Fut: 'static + Send + Future<Output = Result<RenewedTokens, RenewalError>>,
{
	fn renew(&self, refresh_token: TokenSecret) -> RenewalFuture<'_> {
		Box::pin(self(refresh_token))
	}
}

/// Failure reported by a renewal call.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct RenewalError {
	message: String,
	status: Option<u16>,
	#[source]
	source: Option<SharedError>,
}
impl RenewalError {
	/// Creates an error without an HTTP status.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), status: None, source: None }
	}

	/// Wraps an arbitrary error, reusing its message.
	pub fn from_source(src: impl 'static + Send + Sync + StdError) -> Self {
		Self { message: src.to_string(), status: None, source: Some(Arc::new(src)) }
	}

	/// Tags the error with the HTTP status returned by the renewal endpoint.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Human-readable failure message.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// HTTP status returned by the renewal endpoint, if any.
	pub fn status(&self) -> Option<u16> {
		self.status
	}

	/// Returns `true` when the endpoint rejected the refresh token itself (401 or 422).
	pub fn invalidates_credential(&self) -> bool {
		matches!(self.status, Some(401 | 422))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for RenewalError {
	fn from(e: ReqwestError) -> Self {
		let status = e.status().map(|code| code.as_u16());

		Self { status, ..Self::from_source(e) }
	}
}
