//! Single-flight access token renewal with a FIFO queue of waiting callers.
//!
//! [`RefreshCoordinator::ensure_valid_access_token`] hands out the cached access token while it
//! has more than [`EXPIRE_FUDGE`](crate::auth::EXPIRE_FUDGE) left. Once it does not, the first
//! caller becomes the leader of a renewal cycle and invokes the [`RenewalRequest`]; every caller
//! arriving while that cycle is open is queued and receives the leader's outcome, success or
//! failure, in arrival order. The flag is claimed under a lock with no suspension point between
//! check and set, so exactly one renewal runs per cycle on any executor.
//!
//! There is no timeout on the renewal call: a renewal that never resolves keeps every queued
//! caller waiting. Bound it inside the [`RenewalRequest`] if that matters.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{self, RenewedTokens, TokenSecret},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	renewal::RenewalRequest,
	session::Session,
};

type Waiter = oneshot::Sender<Result<TokenSecret>>;

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	waiters: VecDeque<Waiter>,
}

enum Claim {
	Leader,
	Waiter(oneshot::Receiver<Result<TokenSecret>>),
}

/// Owns the refreshing flag and the waiter queue for one client.
///
/// Construct one per client (or share one behind an `Arc` between clients using the same
/// [`Session`]); independent coordinators never observe each other's state.
#[derive(Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator with an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while a renewal cycle is open.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Overrides the refreshing flag. Intended for diagnostics and tests.
	///
	/// Setting the flag without a leader makes new callers queue until a cycle settles; clearing
	/// it while a renewal runs lets a second renewal start.
	pub fn set_refreshing(&self, refreshing: bool) {
		self.state.lock().refreshing = refreshing;
	}

	/// Number of callers currently waiting for the open cycle.
	pub fn queued(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Counters for this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a usable access token, renewing it first if needed.
	///
	/// Returns `Ok(None)` when no refresh token is stored: the caller has no session and should
	/// proceed unauthenticated.
	pub async fn ensure_valid_access_token(
		&self,
		session: &Session,
		renewal: &dyn RenewalRequest,
	) -> Result<Option<TokenSecret>> {
		const KIND: FlowKind = FlowKind::Refresh;

		if session.refresh_token().await?.is_none() {
			return Ok(None);
		}
		if let Some(token) = usable(session.access_token().await?) {
			self.metrics.record_reuse();

			return Ok(Some(token));
		}

		let span = FlowSpan::new(KIND, "ensure_valid_access_token");

		span.instrument(async move {
			match self.claim() {
				Claim::Waiter(outcome) => {
					self.metrics.record_queued();
					obs::record_flow_outcome(KIND, FlowOutcome::Queued);
					obs::flow_event(KIND, FlowOutcome::Queued, "waiting for in-flight renewal");

					outcome.await.unwrap_or_else(|_| Err(Error::RefreshAbandoned)).map(Some)
				},
				Claim::Leader => {
					let mut cycle = Cycle { coordinator: self, attempted: false, settled: false };

					obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

					let result = self.renew(session, renewal, &mut cycle).await;

					obs::record_result(KIND, &result);
					cycle.settle(&result);

					result.map(Some)
				},
			}
		})
		.await
	}

	fn claim(&self) -> Claim {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);

			Claim::Waiter(rx)
		} else {
			state.refreshing = true;

			Claim::Leader
		}
	}

	// Flag first, then hand back the queue, so a caller released by this cycle can open the next.
	fn end_cycle(&self) -> VecDeque<Waiter> {
		let mut state = self.state.lock();

		state.refreshing = false;

		std::mem::take(&mut state.waiters)
	}

	async fn renew(
		&self,
		session: &Session,
		renewal: &dyn RenewalRequest,
		cycle: &mut Cycle<'_>,
	) -> Result<TokenSecret> {
		// A cycle that settled between our first read and the claim may already have a token.
		if let Some(token) = usable(session.access_token().await?) {
			self.metrics.record_reuse();

			return Ok(token);
		}

		let refresh_token = session
			.refresh_token()
			.await?
			.ok_or(Error::NoCredentials { action: "refresh the access token" })?;

		cycle.begin_attempt();
		obs::flow_event(FlowKind::Refresh, FlowOutcome::Attempt, "calling renewal request");

		match renewal.renew(refresh_token).await {
			Ok(renewed) => store_renewed(session, renewed).await,
			Err(err) => match err.status().filter(|_| err.invalidates_credential()) {
				Some(status) => {
					session.clear_auth_tokens().await?;

					Err(Error::RenewalCredentialInvalid { status, source: err })
				},
				None => Err(err.into()),
			},
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("queued", &state.waiters.len())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// One open renewal cycle. Dropping it unsettled (the leader was cancelled) still resets the
/// flag; the queued callers then fail with [`Error::RefreshAbandoned`].
///
/// Successes and failures are only counted for cycles that reached the renewal call, so they
/// always sum to at most [`RefreshMetrics::attempts`].
struct Cycle<'a> {
	coordinator: &'a RefreshCoordinator,
	attempted: bool,
	settled: bool,
}
impl Cycle<'_> {
	fn begin_attempt(&mut self) {
		self.attempted = true;
		self.coordinator.metrics.record_attempt();
	}

	fn settle(mut self, result: &Result<TokenSecret>) {
		self.settled = true;

		if self.attempted {
			match result {
				Ok(_) => self.coordinator.metrics.record_success(),
				Err(_) => self.coordinator.metrics.record_failure(),
			}
		}

		for waiter in self.coordinator.end_cycle() {
			// A waiter whose caller went away has nobody left to tell.
			let _ = waiter.send(result.clone());
		}
	}
}
impl Drop for Cycle<'_> {
	fn drop(&mut self) {
		if !self.settled {
			if self.attempted {
				self.coordinator.metrics.record_failure();
			}

			self.coordinator.end_cycle();
		}
	}
}

fn usable(token: Option<TokenSecret>) -> Option<TokenSecret> {
	token.filter(|token| !auth::is_expired(token.expose()))
}

async fn store_renewed(session: &Session, renewed: RenewedTokens) -> Result<TokenSecret> {
	match renewed {
		RenewedTokens::FullPair(pair) => {
			pair.validate()
				.map_err(|e| Error::InvalidRenewalResult { reason: e.to_string() })?;

			let access_token = pair.access_token.clone();

			session.set_auth_tokens(pair).await?;

			Ok(access_token)
		},
		RenewedTokens::AccessTokenOnly(token) => {
			if token.is_empty() {
				return Err(Error::InvalidRenewalResult {
					reason: "the access token must not be empty".into(),
				});
			}

			session.set_access_token(token.clone()).await?;

			Ok(token)
		},
	}
}
