//! Counters behind the `metrics` feature; every helper is a no-op without it.

// self
use crate::{
	obs::{FlowKind, FlowOutcome},
	provider::MetricsUnavailable,
};

/// Counter incremented once per flow attempt, success and failure.
pub const FLOW_COUNTER: &str = "portfolio_link_flow_total";
/// Counter incremented whenever a connection is committed without metrics.
pub const METRICS_DOWNGRADE_COUNTER: &str = "portfolio_link_metrics_unavailable_total";

/// Counts a flow outcome, labeled by `flow` and `outcome`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
		.increment(1);

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a metrics downgrade, labeled by `platform` and `reason`.
pub fn record_metrics_unavailable(err: &MetricsUnavailable) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		METRICS_DOWNGRADE_COUNTER,
		"platform" => err.platform.as_str(),
		"reason" => err.reason.label()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	{
		let _ = err;
	}
}
