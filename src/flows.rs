//! Link orchestration: connect, callback, commit, disconnect, and analytics flows.
//!
//! [`LinkOrchestrator`] owns the in-flight side of every attempt (the pending authorization
//! registry and the callback correlator) and is the only writer to the [`ConnectionStore`].
//! Each flow lives in its own submodule as an `impl LinkOrchestrator` block.

pub mod pending;
pub mod state;

mod common;
mod connect;
mod manage;

pub use connect::*;
pub use pending::{AttemptStatus, AuthorizationRequest};
pub use state::*;

// self
use crate::{
	_prelude::*,
	analytics::{AnalyticsSource, PlaceholderAnalytics},
	auth::PortfolioId,
	callback::{CallbackCorrelator, CompletionAction},
	config::LinkConfig,
	error::ErrorKind,
	flows::pending::PendingAuthorizations,
	platform::PlatformId,
	provider::AdapterRegistry,
	store::{ConnectionKey, ConnectionStore, ConnectionUpdate},
};

/// A connection write that failed and can be replayed with
/// [`LinkOrchestrator::retry_commit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingCommit(ConnectionUpdate);
impl PendingCommit {
	pub(crate) fn new(update: ConnectionUpdate) -> Self {
		Self(update)
	}

	/// Write that must be replayed.
	pub fn update(&self) -> &ConnectionUpdate {
		&self.0
	}

	/// Consumes the commit, returning the write.
	pub fn into_update(self) -> ConnectionUpdate {
		self.0
	}
}

/// What a successful connect attempt committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSummary {
	/// Linked portfolio.
	pub portfolio_id: PortfolioId,
	/// Linked platform.
	pub platform_id: PlatformId,
	/// Account name reported by the provider.
	pub provider_display_name: Option<String>,
	/// Committed follower count.
	pub follower_count: u64,
	/// Committed media count.
	pub media_count: Option<u64>,
	/// False when metrics were downgraded to zero.
	pub metrics_available: bool,
}
impl ConnectSummary {
	fn from_update(update: &ConnectionUpdate, metrics_available: bool) -> Self {
		Self {
			portfolio_id: update.portfolio_id().clone(),
			platform_id: update.platform_id(),
			provider_display_name: update.provider_display_name().map(ToOwned::to_owned),
			follower_count: update.follower_count(),
			media_count: update.media_count(),
			metrics_available,
		}
	}
}

/// Outcome of [`LinkOrchestrator::handle_callback`].
///
/// `completion` is always present, including on failure, so the callback page can close the
/// popup or navigate away.
#[derive(Debug)]
pub struct CallbackResolution {
	/// What the callback page should do next.
	pub completion: CompletionAction,
	/// Committed connection or the terminal error.
	pub result: Result<ConnectSummary>,
}
impl CallbackResolution {
	/// Converts the resolution into the JSON payload returned to the UI.
	pub fn into_reply(self) -> CallbackReply {
		let CallbackResolution { completion, result } = self;

		match result {
			Ok(summary) => CallbackReply {
				success: true,
				provider_display_name: summary.provider_display_name,
				follower_count: Some(summary.follower_count),
				media_count: summary.media_count,
				error: None,
				completion,
			},
			Err(err) => CallbackReply {
				success: false,
				provider_display_name: None,
				follower_count: None,
				media_count: None,
				error: Some(ReplyError { kind: err.kind(), message: err.user_message() }),
				completion,
			},
		}
	}
}

/// Serializable callback reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackReply {
	/// Whether the connection was committed.
	pub success: bool,
	/// Account name reported by the provider.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider_display_name: Option<String>,
	/// Committed follower count.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub follower_count: Option<u64>,
	/// Committed media count.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub media_count: Option<u64>,
	/// Failure details.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ReplyError>,
	/// What the callback page should do next.
	pub completion: CompletionAction,
}

/// Error half of a [`CallbackReply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyError {
	/// Stable error label.
	pub kind: ErrorKind,
	/// Message suitable for a toast.
	pub message: String,
}

/// Coordinates link attempts across the registered provider adapters.
///
/// Cloning is cheap; clones share the pending registry, the commit guards, and the store.
#[derive(Clone)]
pub struct LinkOrchestrator {
	registry: AdapterRegistry,
	store: Arc<dyn ConnectionStore>,
	analytics: Arc<dyn AnalyticsSource>,
	config: LinkConfig,
	pending: PendingAuthorizations,
	correlator: CallbackCorrelator,
	commit_guards: Arc<Mutex<HashMap<ConnectionKey, Arc<AsyncMutex<()>>>>>,
}
impl LinkOrchestrator {
	/// Creates an orchestrator serving the registry's platforms and writing to `store`.
	///
	/// Analytics default to [`PlaceholderAnalytics`].
	pub fn new(registry: AdapterRegistry, store: Arc<dyn ConnectionStore>, config: LinkConfig) -> Self {
		let pending = PendingAuthorizations::new(config.authorization_ttl);
		let correlator = CallbackCorrelator::new(pending.clone(), config.correlation.clone());

		Self {
			registry,
			store,
			analytics: Arc::new(PlaceholderAnalytics),
			config,
			pending,
			correlator,
			commit_guards: Default::default(),
		}
	}

	/// Replaces the analytics source.
	pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSource>) -> Self {
		self.analytics = analytics;

		self
	}

	/// Adapter registry in use.
	pub fn registry(&self) -> &AdapterRegistry {
		&self.registry
	}

	/// Configuration in use.
	pub fn config(&self) -> &LinkConfig {
		&self.config
	}

	/// Correlator used by [`LinkOrchestrator::handle_callback`].
	pub fn correlator(&self) -> &CallbackCorrelator {
		&self.correlator
	}
}
impl Debug for LinkOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkOrchestrator")
			.field("registry", &self.registry)
			.field("exchange_timeout", &self.config.exchange_timeout)
			.field("metrics_timeout", &self.config.metrics_timeout)
			.field("authorization_ttl", &self.config.authorization_ttl)
			.field("correlation", &self.config.correlation)
			.finish()
	}
}
