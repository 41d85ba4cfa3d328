// self
use crate::{
	_prelude::*,
	auth::PortfolioId,
	flows::{LinkEvent, LinkState},
	obs::FlowKind,
	platform::PlatformId,
	provider::MetricsUnavailable,
};

/// Logs a state machine transition at debug level.
pub fn log_transition(platform: PlatformId, from: LinkState, event: &LinkEvent, to: LinkState) {
	#[cfg(feature = "tracing")]
	::tracing::debug!(platform = platform.as_str(), ?from, ?event, ?to, "link state transition");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (platform, from, event, to);
	}
}

/// Logs a metrics downgrade; the connection is still committed.
pub fn log_metrics_unavailable(err: &MetricsUnavailable) {
	#[cfg(feature = "tracing")]
	::tracing::warn!(
		platform = err.platform.as_str(),
		reason = %err.reason,
		"metrics unavailable, committing with zeroed counters"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}

/// Logs a failure surfaced to the caller.
pub fn log_failure(flow: FlowKind, platform: Option<PlatformId>, err: &Error) {
	#[cfg(feature = "tracing")]
	::tracing::warn!(
		flow = flow.as_str(),
		platform = platform.map(PlatformId::as_str),
		kind = err.kind().as_str(),
		error = %err,
		"link flow failed"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (flow, platform, err);
	}
}

/// Logs that a callback without `state` or `platform` was attributed to the legacy platform.
pub fn log_legacy_platform_fallback(portfolio_id: &PortfolioId, platform: PlatformId) {
	#[cfg(feature = "tracing")]
	::tracing::warn!(
		portfolio_id = portfolio_id.as_ref(),
		platform = platform.as_str(),
		"callback carried no platform, assuming legacy default"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (portfolio_id, platform);
	}
}

/// Logs a cancellation request and whether it reached a pending request.
pub fn log_cancellation(cancelled: bool) {
	#[cfg(feature = "tracing")]
	::tracing::debug!(cancelled, "authorization request cancellation");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = cancelled;
	}
}
