//! Optional observability helpers for link flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `portfolio_link.flow` with the `flow`,
//!   `stage` (call site) and `platform` fields, plus debug/warn events for state transitions,
//!   metrics downgrades and terminal failures.
//! - Enable `metrics` to increment the `portfolio_link_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and
//!   `portfolio_link_metrics_unavailable_total` for every downgraded commit, labeled by
//!   `platform` + `reason`.
//!
//! Access tokens, client secrets and authorization codes never reach these helpers.

mod log;
mod metrics;
mod tracing;

pub use log::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Link flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization URL issuance.
	Connect,
	/// Callback correlation, token exchange and metrics lookup.
	Callback,
	/// Connection commit (first attempt or retry).
	Commit,
	/// Disconnect request.
	Disconnect,
	/// Analytics snapshot read.
	Analytics,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Connect => "connect",
			FlowKind::Callback => "callback",
			FlowKind::Commit => "commit",
			FlowKind::Disconnect => "disconnect",
			FlowKind::Analytics => "analytics",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
