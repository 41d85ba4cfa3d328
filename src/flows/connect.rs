//! Connect flow: authorization URL issuance, callback handling, and the connection commit.
//!
//! [`LinkOrchestrator::start_connect`] registers a pending request keyed by a random `state`
//! token. [`LinkOrchestrator::handle_callback`] correlates the redirect, exchanges the code
//! within the exchange timeout, fetches metrics within the metrics timeout, and commits exactly
//! once. Metrics failures downgrade to zero followers; every other failure is terminal and
//! leaves the store untouched, except a failed commit, which is returned as a
//! [`PendingCommit`](crate::flows::PendingCommit) for [`LinkOrchestrator::retry_commit`].

// self
use crate::{
	_prelude::*,
	auth::{PortfolioId, ScopeSet},
	callback::{CallbackParams, CallbackResult, CompletionMode, CorrelationError},
	error::{ConfigError, ErrorKind, TokenExchangeError},
	flows::{
		AttemptStatus, AuthorizationRequest, CallbackResolution, ConnectSummary, LinkAttempt,
		LinkEvent, LinkOrchestrator, LinkState, PendingCommit, common,
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	oauth2::AuthorizationCode,
	platform::PlatformId,
	provider::{MetricsSnapshot, MetricsUnavailable, MetricsUnavailableReason},
	store::ConnectionUpdate,
};

const EXPIRED_MESSAGE: &str = "The authorization request expired.";

/// Request to link a portfolio to a platform.
#[derive(Clone, Debug)]
pub struct ConnectIntent {
	/// Portfolio being linked.
	pub portfolio_id: PortfolioId,
	/// Platform label as supplied by the UI.
	pub platform: String,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// How the UI opens the authorization page.
	pub launch_mode: CompletionMode,
	/// Scopes to request instead of the provider defaults.
	pub scopes: Option<ScopeSet>,
}
impl ConnectIntent {
	/// Creates a popup intent using the provider's default scopes.
	pub fn new(portfolio_id: PortfolioId, platform: impl Into<String>, redirect_uri: Url) -> Self {
		Self {
			portfolio_id,
			platform: platform.into(),
			redirect_uri,
			launch_mode: CompletionMode::Popup,
			scopes: None,
		}
	}

	/// Overrides the launch mode.
	pub fn with_launch_mode(mut self, launch_mode: CompletionMode) -> Self {
		self.launch_mode = launch_mode;

		self
	}

	/// Requests explicit scopes.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}
}

impl LinkOrchestrator {
	/// Builds the authorization URL and registers the pending request.
	///
	/// Unknown platforms fail with [`Error::UnsupportedPlatform`] and platforms without
	/// credentials with [`Error::Config`]; neither registers anything.
	pub fn start_connect(&self, intent: ConnectIntent) -> Result<AuthorizationRequest> {
		const KIND: FlowKind = FlowKind::Connect;

		let _span = FlowSpan::new(KIND, "start_connect", &intent.platform).entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let platform = intent.platform.parse::<PlatformId>().ok();
		let result = self.issue_authorization(intent);

		common::report(KIND, platform, &result);

		result
	}

	/// Correlates a provider redirect and, when it carries a code, completes the attempt.
	///
	/// The returned [`CallbackResolution`] always names a completion action.
	pub async fn handle_callback(&self, params: CallbackParams) -> CallbackResolution {
		const KIND: FlowKind = FlowKind::Callback;

		let span =
			FlowSpan::new(KIND, "handle_callback", params.platform.as_deref().unwrap_or("unknown"));

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		span.instrument(async move {
			let callback = match self.correlator.correlate(&params) {
				Ok(callback) => callback,
				Err(failure) => {
					let completion = failure.action();
					let result = Err(Error::from(failure.error));

					common::report(KIND, None, &result);

					return CallbackResolution { completion, result };
				},
			};
			let platform = callback.platform_id;
			let mode = callback.completion;
			let portfolio_id = callback.portfolio_id.clone();
			let result = self.complete_attempt(callback).await;
			let completion = mode.action(Some(&portfolio_id), result.is_ok());

			common::report(KIND, Some(platform), &result);

			CallbackResolution { completion, result }
		})
		.await
	}

	/// Replays a commit that previously failed with [`Error::Persistence`].
	///
	/// Safe to call repeatedly; the write is a full upsert.
	pub async fn retry_commit(&self, pending: PendingCommit) -> Result<()> {
		const KIND: FlowKind = FlowKind::Commit;

		let platform = pending.update().platform_id();
		let span = FlowSpan::new(KIND, "retry_commit", platform.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(common::commit(self, pending.into_update())).await;

		common::report(KIND, Some(platform), &result);

		result
	}

	/// Cancels an unclaimed request, typically because the popup was closed.
	///
	/// Returns false when the request is unknown or already claimed or finished.
	pub fn cancel(&self, state: &str) -> bool {
		let cancelled = self.pending.cancel(state, "The authorization window was closed.");

		obs::log_cancellation(cancelled);

		cancelled
	}

	/// Waits for the attempt registered under `state` to finish.
	///
	/// The wait is bounded by the request's remaining TTL. When it elapses an unclaimed request
	/// is cancelled; a claimed one gets the exchange and metrics timeouts as grace before the
	/// wait gives up with [`ErrorKind::UserCancelled`].
	pub async fn await_completion(&self, state: &str) -> Result<ConnectSummary> {
		let (mut receiver, expires_at) =
			self.pending.subscribe(state).ok_or(CorrelationError::UnknownState)?;
		let remaining = (expires_at - OffsetDateTime::now_utc()).max(Duration::ZERO);
		let status = match wait_terminal(&mut receiver, remaining).await {
			Some(status) => status,
			None => {
				self.cancel(state);

				let grace = self.config.exchange_timeout + self.config.metrics_timeout;

				wait_terminal(&mut receiver, grace).await.unwrap_or_else(expired_status)
			},
		};

		match status {
			AttemptStatus::Connected(summary) => Ok(summary),
			AttemptStatus::Failed { kind, message, pending } =>
				Err(Error::AttemptFailed { kind, message, pending: pending.map(Box::new) }),
			AttemptStatus::Pending => Err(Error::AttemptFailed {
				kind: ErrorKind::UserCancelled,
				message: EXPIRED_MESSAGE.into(),
				pending: None,
			}),
		}
	}

	fn issue_authorization(&self, intent: ConnectIntent) -> Result<AuthorizationRequest> {
		let ConnectIntent { portfolio_id, platform, redirect_uri, launch_mode, scopes } = intent;
		let (platform_id, adapter) = self.registry.resolve(&platform)?;
		let mut attempt = LinkAttempt::resume(platform_id, LinkState::Idle);
		let state = common::generate_state();
		let auth_url = adapter.build_authorization_url(&redirect_uri, scopes.as_ref(), &state)?;
		let issued_at = OffsetDateTime::now_utc();
		let request = AuthorizationRequest {
			platform_id,
			portfolio_id,
			redirect_uri,
			auth_url,
			state,
			launch_mode,
			issued_at,
			expires_at: issued_at + self.config.authorization_ttl,
		};

		attempt.advance(LinkEvent::AuthorizationIssued)?;
		self.pending.register(request.clone());

		Ok(request)
	}

	async fn complete_attempt(&self, callback: CallbackResult) -> Result<ConnectSummary> {
		let CallbackResult { code, platform_id, portfolio_id, redirect_uri, ticket, .. } = callback;
		let mut attempt = LinkAttempt::resume(platform_id, LinkState::AuthorizationIssued);
		let result = self.exchange_and_commit(&mut attempt, &code, portfolio_id, &redirect_uri).await;

		match &result {
			Ok(summary) => ticket.complete(summary.clone()),
			Err(err) => {
				attempt.fail(err.kind());
				ticket.fail_with(err);
			},
		}

		result
	}

	async fn exchange_and_commit(
		&self,
		attempt: &mut LinkAttempt,
		code: &AuthorizationCode,
		portfolio_id: PortfolioId,
		redirect_uri: &Url,
	) -> Result<ConnectSummary> {
		attempt.advance(LinkEvent::CallbackAccepted)?;

		let platform = attempt.platform();
		let adapter =
			self.registry.get(platform).ok_or(ConfigError::MissingCredentials { platform })?;
		let exchange_limit = self.config.exchange_timeout;
		let exchange =
			tokio::time::timeout(exchange_limit.unsigned_abs(), adapter.exchange_code(code, redirect_uri))
				.await
				.map_err(|_| TokenExchangeError::timeout(platform, exchange_limit))??;

		attempt.advance(LinkEvent::TokenExchanged)?;

		let metrics = match tokio::time::timeout(
			self.config.metrics_timeout.unsigned_abs(),
			adapter.fetch_metrics(&exchange.access_token, &exchange.provider_user_id),
		)
		.await
		{
			Ok(Ok(snapshot)) => Some(snapshot),
			Ok(Err(unavailable)) => downgrade(unavailable),
			Err(_) =>
				downgrade(MetricsUnavailable { platform, reason: MetricsUnavailableReason::Timeout }),
		};
		let update = ConnectionUpdate::connected(
			portfolio_id,
			platform,
			metrics.map_or(0, |snapshot| snapshot.follower_count),
			metrics.and_then(|snapshot| snapshot.media_count),
			exchange.provider_display_name,
		);
		let summary = ConnectSummary::from_update(&update, metrics.is_some());

		common::commit(self, update).await?;
		attempt.advance(LinkEvent::Committed)?;

		Ok(summary)
	}
}

async fn wait_terminal(
	receiver: &mut tokio::sync::watch::Receiver<AttemptStatus>,
	limit: Duration,
) -> Option<AttemptStatus> {
	let outcome = tokio::time::timeout(
		limit.unsigned_abs(),
		receiver.wait_for(AttemptStatus::is_terminal),
	)
	.await
	.map(|waited| waited.map(|status| status.clone()));

	match outcome {
		Ok(Ok(status)) => Some(status),
		// Sender gone: the entry was pruned and no ticket is alive.
		Ok(Err(_)) => Some(receiver.borrow().clone()),
		Err(_) => None,
	}
}

fn downgrade(unavailable: MetricsUnavailable) -> Option<MetricsSnapshot> {
	obs::log_metrics_unavailable(&unavailable);
	obs::record_metrics_unavailable(&unavailable);

	None
}

fn expired_status() -> AttemptStatus {
	AttemptStatus::Failed {
		kind: ErrorKind::UserCancelled,
		message: EXPIRED_MESSAGE.into(),
		pending: None,
	}
}
