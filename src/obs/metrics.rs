// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded flow outcome.
pub const FLOW_COUNTER: &str = "bearer_refresh_flow_total";

/// Increments [`FLOW_COUNTER`] labeled by `flow` and `outcome` (no-op without `metrics`).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
