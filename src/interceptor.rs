//! Request authenticator: puts the current access token on outgoing requests.
//!
//! [`AuthTokenInterceptor::authenticate`] asks the [`RefreshCoordinator`] for a usable access
//! token and writes `{header_prefix}{token}` into the configured header. Requests made without a
//! stored session pass through untouched; refresh failures reject the request with
//! [`Error::RequestAuthentication`].

// self
#[cfg(feature = "reqwest")] use crate::error::ConfigError;
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::RefreshCoordinator,
	renewal::RenewalRequest,
	session::Session,
};

const DEFAULT_HEADER_NAME: &str = "Authorization";
const DEFAULT_HEADER_PREFIX: &str = "Bearer ";

/// Header placement for the access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterceptorConfig {
	/// Header receiving the token.
	pub header_name: String,
	/// Text written before the token, including any separator.
	pub header_prefix: String,
}
impl InterceptorConfig {
	/// Overrides the header name.
	pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
		self.header_name = header_name.into();

		self
	}

	/// Overrides the value prefix.
	pub fn with_header_prefix(mut self, header_prefix: impl Into<String>) -> Self {
		self.header_prefix = header_prefix.into();

		self
	}
}
impl Default for InterceptorConfig {
	fn default() -> Self {
		Self {
			header_name: DEFAULT_HEADER_NAME.into(),
			header_prefix: DEFAULT_HEADER_PREFIX.into(),
		}
	}
}

/// Outgoing request shape the interceptor can write a header into.
pub trait AuthorizeRequest {
	/// Sets `name` to `value`, replacing any previous value.
	fn insert_header(&mut self, name: &str, value: &str) -> Result<()>;
}
impl AuthorizeRequest for BTreeMap<String, String> {
	fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
		self.insert(name.to_owned(), value.to_owned());

		Ok(())
	}
}
impl AuthorizeRequest for HashMap<String, String> {
	fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
		self.insert(name.to_owned(), value.to_owned());

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizeRequest for reqwest::header::HeaderMap {
	fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
		// crates.io
		use reqwest::header::{HeaderName, HeaderValue};

		let header_name = HeaderName::from_bytes(name.as_bytes())
			.map_err(|e| ConfigError::invalid_header(name, e))?;
		let mut header_value =
			HeaderValue::from_str(value).map_err(|e| ConfigError::invalid_header(name, e))?;

		header_value.set_sensitive(true);
		self.insert(header_name, header_value);

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizeRequest for reqwest::Request {
	fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
		self.headers_mut().insert_header(name, value)
	}
}

/// Authenticates requests for one [`Session`].
///
/// Cloning is cheap; clones share the session, the coordinator, and therefore the single-flight
/// renewal.
#[derive(Clone)]
pub struct AuthTokenInterceptor {
	session: Arc<Session>,
	coordinator: Arc<RefreshCoordinator>,
	renewal: Arc<dyn RenewalRequest>,
	config: InterceptorConfig,
}
impl AuthTokenInterceptor {
	/// Creates an interceptor with its own coordinator and the default `Authorization: Bearer`
	/// header.
	pub fn new(session: Arc<Session>, renewal: Arc<dyn RenewalRequest>) -> Self {
		Self {
			session,
			coordinator: Default::default(),
			renewal,
			config: InterceptorConfig::default(),
		}
	}

	/// Shares an existing coordinator, so several interceptors renew at most once between them.
	pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = coordinator;

		self
	}

	/// Overrides the header placement.
	pub fn with_config(mut self, config: InterceptorConfig) -> Self {
		self.config = config;

		self
	}

	/// Session whose tokens are attached.
	pub fn session(&self) -> &Arc<Session> {
		&self.session
	}

	/// Coordinator guarding renewals for this interceptor.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Active header placement.
	pub fn config(&self) -> &InterceptorConfig {
		&self.config
	}

	/// Returns `request` carrying the access token header, renewing the token first if needed.
	///
	/// Without a stored refresh token the request is returned unchanged. If the token cannot be
	/// obtained the request is dropped and the refresh failure is returned wrapped in
	/// [`Error::RequestAuthentication`].
	pub async fn authenticate<R>(&self, mut request: R) -> Result<R>
	where
		R: AuthorizeRequest,
	{
		const KIND: FlowKind = FlowKind::Authenticate;

		let span = FlowSpan::new(KIND, "authenticate");
		let token = span
			.instrument(
				self.coordinator.ensure_valid_access_token(&self.session, self.renewal.as_ref()),
			)
			.await;

		match token {
			Ok(Some(token)) => {
				request.insert_header(
					&self.config.header_name,
					&format!("{}{}", self.config.header_prefix, token.expose()),
				)?;
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				Ok(request)
			},
			Ok(None) => {
				obs::flow_event(KIND, FlowOutcome::Success, "no session; request sent as is");

				Ok(request)
			},
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				Err(Error::RequestAuthentication { source: Box::new(err) })
			},
		}
	}
}
impl Debug for AuthTokenInterceptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthTokenInterceptor")
			.field("session", &self.session)
			.field("coordinator", &self.coordinator)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
