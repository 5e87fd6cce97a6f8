//! reqwest integration: a client that authenticates every request before sending it.

// std
use std::ops::Deref;
// crates.io
use reqwest::{Request, RequestBuilder, Response};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	interceptor::AuthTokenInterceptor,
};

/// [`ReqwestClient`] with an [`AuthTokenInterceptor`] registered in front of it.
///
/// Redirects follow the wrapped client's policy; the access token header is only attached to the
/// original request, so configure the client accordingly if redirects may cross origins.
#[derive(Clone, Debug)]
pub struct AuthenticatedClient {
	client: ReqwestClient,
	interceptor: Arc<AuthTokenInterceptor>,
}
impl AuthenticatedClient {
	/// Wraps a default [`ReqwestClient`].
	pub fn new(interceptor: AuthTokenInterceptor) -> Self {
		Self::with_client(ReqwestClient::default(), interceptor)
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, interceptor: AuthTokenInterceptor) -> Self {
		Self { client, interceptor: Arc::new(interceptor) }
	}

	/// Interceptor applied to every request.
	pub fn interceptor(&self) -> &AuthTokenInterceptor {
		&self.interceptor
	}

	/// Authenticates and sends a built request.
	pub async fn execute(&self, request: Request) -> Result<Response> {
		let request = self.interceptor.authenticate(request).await?;

		Ok(self.client.execute(request).await.map_err(TransportError::from)?)
	}

	/// Builds, authenticates, and sends a request assembled with [`RequestBuilder`].
	pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
		let request = builder.build().map_err(ConfigError::request_build)?;

		self.execute(request).await
	}
}
impl AsRef<ReqwestClient> for AuthenticatedClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
impl Deref for AuthenticatedClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
