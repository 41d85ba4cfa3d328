//! Callback correlation: ties a provider redirect back to the request that started it.
//!
//! The popup (or full-page redirect) lands on the application's callback route with whatever
//! the provider appended. [`CallbackParams`] captures those raw parameters and
//! [`CallbackCorrelator`] resolves them against the pending authorization registry. A matched
//! request is claimed before anything else is checked, so every correlated request reaches a
//! terminal status even when the callback turns out to be unusable.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, PortfolioId},
	error::ErrorKind,
	flows::pending::{AttemptTicket, ClaimError, PendingAuthorizations},
	obs,
	oauth2::AuthorizationCode,
	platform::{PlatformId, UnsupportedPlatform},
};

const ACCESS_DENIED: &str = "access_denied";

/// How the UI opened the provider's authorization page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
	/// A popup window that should close itself once the callback is handled.
	#[default]
	Popup,
	/// A full-page redirect that should navigate back into the application.
	Redirect,
}
impl CompletionMode {
	/// Action the callback page should take after the attempt ends.
	pub fn action(self, portfolio_id: Option<&PortfolioId>, succeeded: bool) -> CompletionAction {
		match (self, portfolio_id) {
			(CompletionMode::Popup, _) => CompletionAction::CloseWindow,
			(CompletionMode::Redirect, Some(portfolio_id)) if succeeded =>
				CompletionAction::Navigate(format!("/portfolio/{portfolio_id}/settings")),
			(CompletionMode::Redirect, _) => CompletionAction::Navigate("/portfolios".into()),
		}
	}
}

/// What the callback page does once the attempt is resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum CompletionAction {
	/// Close the popup; the opener observes the outcome.
	CloseWindow,
	/// Navigate the current window to the given application path.
	Navigate(String),
}

/// Raw parameters delivered to the callback route.
///
/// Empty values are treated as absent. The authorization code is redacted in `Debug`.
#[derive(Clone, Debug, Default)]
pub struct CallbackParams {
	/// Authorization code issued by the provider.
	pub code: Option<AuthorizationCode>,
	/// Correlation token echoed back by the provider.
	pub state: Option<String>,
	/// Platform label appended by the application to its redirect URI.
	pub platform: Option<String>,
	/// Portfolio identifier appended by the application to its redirect URI.
	pub portfolio_id: Option<String>,
	/// OAuth error code reported by the provider.
	pub error: Option<String>,
	/// Human-readable OAuth error description.
	pub error_description: Option<String>,
	/// Launch mode override (`1`/`true` for popup, `0`/`false` for redirect).
	pub popup: Option<bool>,
}
impl CallbackParams {
	/// Collects known parameters from key/value pairs; unknown keys are ignored.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut params = Self::default();

		for (key, value) in pairs {
			let value = value.as_ref().trim();

			if value.is_empty() {
				continue;
			}

			match key.as_ref() {
				"code" => params.code = Some(AuthorizationCode::new(value.to_owned())),
				"state" => params.state = Some(value.to_owned()),
				"platform" => params.platform = Some(value.to_owned()),
				"portfolio_id" | "portfolioId" => params.portfolio_id = Some(value.to_owned()),
				"error" => params.error = Some(value.to_owned()),
				"error_description" => params.error_description = Some(value.to_owned()),
				"popup" => params.popup = parse_flag(value),
				_ => {},
			}
		}

		params
	}

	/// Parses a raw query string, with or without the leading `?`.
	pub fn from_query(query: &str) -> Self {
		let query = query.strip_prefix('?').unwrap_or(query);

		Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
	}

	/// Parses the query component of a full callback URL.
	pub fn from_url(url: &Url) -> Self {
		Self::from_pairs(url.query_pairs())
	}

	/// Sets the authorization code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(AuthorizationCode::new(code.into()));

		self
	}

	/// Sets the correlation token.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets the portfolio identifier.
	pub fn with_portfolio_id(mut self, portfolio_id: impl Into<String>) -> Self {
		self.portfolio_id = Some(portfolio_id.into());

		self
	}

	/// Sets the platform label.
	pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
		self.platform = Some(platform.into());

		self
	}

	/// Sets the provider error pair.
	pub fn with_error(mut self, error: impl Into<String>, description: Option<String>) -> Self {
		self.error = Some(error.into());
		self.error_description = description;

		self
	}

	/// Overrides the launch mode.
	pub fn with_popup(mut self, popup: bool) -> Self {
		self.popup = Some(popup);

		self
	}

	fn completion_override(&self) -> Option<CompletionMode> {
		self.popup.map(|popup| if popup { CompletionMode::Popup } else { CompletionMode::Redirect })
	}

	fn provider_error(&self) -> Option<CorrelationError> {
		let error = self.error.as_deref()?;
		let description = self.error_description.clone();

		Some(if error == ACCESS_DENIED {
			CorrelationError::Denied { description }
		} else {
			CorrelationError::ProviderError { error: error.to_owned(), description }
		})
	}
}

fn parse_flag(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" => Some(true),
		"0" | "false" => Some(false),
		_ => None,
	}
}

/// How callbacks without a `state` parameter are attributed to a platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationPolicy {
	/// Platform assumed when a legacy callback names none; `None` rejects such callbacks.
	pub legacy_platform: Option<PlatformId>,
}
impl CorrelationPolicy {
	/// Rejects callbacks that carry neither `state` nor `platform`.
	pub fn strict() -> Self {
		Self { legacy_platform: None }
	}
}
impl Default for CorrelationPolicy {
	fn default() -> Self {
		Self { legacy_platform: Some(PlatformId::Instagram) }
	}
}

/// Reasons a callback could not be correlated.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CorrelationError {
	/// The user declined the authorization prompt.
	#[error("the user denied access")]
	Denied {
		/// Provider-supplied description.
		description: Option<String>,
	},
	/// The provider reported an OAuth error other than a denial.
	#[error("provider returned `{error}`: {}", .description.as_deref().unwrap_or("no description"))]
	ProviderError {
		/// OAuth error code.
		error: String,
		/// Provider-supplied description.
		description: Option<String>,
	},
	/// No request was issued with the callback's `state`.
	#[error("unknown authorization state")]
	UnknownState,
	/// The request was already consumed by an earlier callback.
	#[error("authorization request was already used")]
	AlreadyUsed,
	/// The request was cancelled before the callback arrived.
	#[error("authorization request was cancelled")]
	Cancelled,
	/// The request outlived its TTL.
	#[error("authorization request expired")]
	Expired,
	/// A required parameter was absent.
	#[error("missing `{0}` parameter")]
	MissingField(&'static str),
	/// An explicit parameter contradicts the matched request.
	#[error("`{0}` does not match the authorization request")]
	Mismatch(&'static str),
	/// The portfolio identifier failed validation.
	#[error("invalid portfolio identifier: {0}")]
	InvalidPortfolio(#[source] IdentifierError),
	/// The platform label is unknown.
	#[error(transparent)]
	UnsupportedPlatform(UnsupportedPlatform),
	/// A legacy callback matched no in-flight request for its portfolio and platform.
	#[error("no authorization request is pending for this portfolio")]
	NoPendingRequest,
}
impl CorrelationError {
	/// Error taxonomy label.
	pub fn kind(&self) -> ErrorKind {
		match self {
			CorrelationError::Denied { .. }
			| CorrelationError::Cancelled
			| CorrelationError::Expired => ErrorKind::UserCancelled,
			CorrelationError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
			_ => ErrorKind::MissingCallbackData,
		}
	}

	fn from_claim(err: ClaimError, legacy: bool) -> Self {
		match err {
			ClaimError::Unknown if legacy => CorrelationError::NoPendingRequest,
			ClaimError::Unknown => CorrelationError::UnknownState,
			ClaimError::AlreadyClaimed | ClaimError::Failed(_) => CorrelationError::AlreadyUsed,
			ClaimError::Cancelled => CorrelationError::Cancelled,
			ClaimError::Expired => CorrelationError::Expired,
		}
	}
}
impl From<CorrelationError> for Error {
	fn from(e: CorrelationError) -> Self {
		match e {
			CorrelationError::UnsupportedPlatform(inner) => Error::UnsupportedPlatform(inner),
			e if e.kind() == ErrorKind::UserCancelled =>
				Error::UserCancelled { reason: e.to_string() },
			e => Error::MissingCallbackData { detail: e.to_string() },
		}
	}
}

/// A correlation failure plus what the callback page should do about it.
#[derive(Clone, Debug)]
pub struct CorrelationFailure {
	/// Why correlation failed.
	pub error: CorrelationError,
	/// Completion mode of the matched request (or the `popup` override).
	pub completion: CompletionMode,
	/// Portfolio of the matched request, when one was found.
	pub portfolio_id: Option<PortfolioId>,
}
impl CorrelationFailure {
	/// Action the callback page should take.
	pub fn action(&self) -> CompletionAction {
		self.completion.action(self.portfolio_id.as_ref(), false)
	}
}

/// A callback matched to its authorization request and carrying a code.
#[derive(Debug)]
pub struct CallbackResult {
	/// Single-use authorization code.
	pub code: AuthorizationCode,
	/// Platform of the matched request.
	pub platform_id: PlatformId,
	/// Portfolio of the matched request.
	pub portfolio_id: PortfolioId,
	/// Redirect URI replayed during the exchange.
	pub redirect_uri: Url,
	/// Correlation token of the matched request.
	pub state: String,
	/// Resolved completion mode.
	pub completion: CompletionMode,
	pub(crate) ticket: AttemptTicket,
}

/// Resolves callbacks against the pending authorization registry.
#[derive(Clone, Debug)]
pub struct CallbackCorrelator {
	pending: PendingAuthorizations,
	policy: CorrelationPolicy,
}
impl CallbackCorrelator {
	pub(crate) fn new(pending: PendingAuthorizations, policy: CorrelationPolicy) -> Self {
		Self { pending, policy }
	}

	/// Active correlation policy.
	pub fn policy(&self) -> &CorrelationPolicy {
		&self.policy
	}

	/// Matches `params` to a pending request and claims it.
	///
	/// On success the caller owns the attempt and must finish it. On failure any claimed request
	/// has already been failed, so a replayed callback is rejected.
	pub fn correlate(&self, params: &CallbackParams) -> Result<CallbackResult, CorrelationFailure> {
		let now = OffsetDateTime::now_utc();
		let fallback_mode = params.completion_override().unwrap_or_default();
		let ticket = match params.state.as_deref() {
			Some(state) => self.pending.claim(state, now).map_err(|err| {
				CorrelationError::from_claim(err, false)
			}),
			None => self.claim_legacy(params, now),
		};
		let ticket = match ticket {
			Ok(ticket) => ticket,
			Err(err) => {
				let error = params.provider_error().unwrap_or(err);

				return Err(CorrelationFailure {
					error,
					completion: fallback_mode,
					portfolio_id: None,
				});
			},
		};
		let completion = params.completion_override().unwrap_or(ticket.request.launch_mode);
		let portfolio_id = ticket.request.portfolio_id.clone();
		let check = params
			.provider_error()
			.map_or_else(|| check_consistency(params, &ticket), Err)
			.and_then(|_| params.code.clone().ok_or(CorrelationError::MissingField("code")));
		let code = match check {
			Ok(code) => code,
			Err(error) => {
				ticket.fail(error.kind(), Error::from(error.clone()).user_message());

				return Err(CorrelationFailure {
					error,
					completion,
					portfolio_id: Some(portfolio_id),
				});
			},
		};
		let request = &ticket.request;

		Ok(CallbackResult {
			code,
			platform_id: request.platform_id,
			portfolio_id,
			redirect_uri: request.redirect_uri.clone(),
			state: request.state.clone(),
			completion,
			ticket,
		})
	}

	fn claim_legacy(
		&self,
		params: &CallbackParams,
		now: OffsetDateTime,
	) -> Result<AttemptTicket, CorrelationError> {
		let portfolio_id = params
			.portfolio_id
			.as_deref()
			.ok_or(CorrelationError::MissingField("portfolio_id"))?;
		let portfolio_id = PortfolioId::new(portfolio_id).map_err(CorrelationError::InvalidPortfolio)?;
		let platform = match params.platform.as_deref() {
			Some(label) =>
				label.parse::<PlatformId>().map_err(CorrelationError::UnsupportedPlatform)?,
			None => {
				let platform =
					self.policy.legacy_platform.ok_or(CorrelationError::MissingField("platform"))?;

				obs::log_legacy_platform_fallback(&portfolio_id, platform);

				platform
			},
		};

		self.pending
			.claim_pair(&portfolio_id, platform, now)
			.map_err(|err| CorrelationError::from_claim(err, true))
	}
}

fn check_consistency(params: &CallbackParams, ticket: &AttemptTicket) -> Result<(), CorrelationError> {
	let request = &ticket.request;

	if params.portfolio_id.as_deref().is_some_and(|id| id != request.portfolio_id.as_ref()) {
		return Err(CorrelationError::Mismatch("portfolio_id"));
	}
	if params
		.platform
		.as_deref()
		.is_some_and(|label| !label.trim().eq_ignore_ascii_case(request.platform_id.as_str()))
	{
		return Err(CorrelationError::Mismatch("platform"));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::flows::pending::{AttemptStatus, AuthorizationRequest};

	fn correlator(policy: CorrelationPolicy) -> (CallbackCorrelator, PendingAuthorizations) {
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		(CallbackCorrelator::new(pending.clone(), policy), pending)
	}

	fn register(pending: &PendingAuthorizations, state: &str, mode: CompletionMode) {
		let now = OffsetDateTime::now_utc();
		let redirect =
			Url::parse("https://app.example.com/auth/callback").expect("Fixture URL should parse.");

		pending.register(AuthorizationRequest {
			platform_id: PlatformId::Instagram,
			portfolio_id: PortfolioId::new("p1").expect("Portfolio fixture should be valid."),
			redirect_uri: redirect.clone(),
			auth_url: redirect,
			state: state.into(),
			launch_mode: mode,
			issued_at: now,
			expires_at: now + Duration::minutes(5),
		});
	}

	#[test]
	fn parses_query_aliases_and_drops_empty_values() {
		let params =
			CallbackParams::from_query("?code=abc123&portfolioId=p1&state=&popup=0&extra=1");

		assert!(params.code.is_some());
		assert_eq!(params.portfolio_id.as_deref(), Some("p1"));
		assert_eq!(params.state, None);
		assert_eq!(params.popup, Some(false));
		assert!(!format!("{params:?}").contains("abc123"), "Debug output must redact the code.");
	}

	#[test]
	fn state_callbacks_resolve_the_matching_request() {
		let (correlator, pending) = correlator(CorrelationPolicy::default());

		register(&pending, "s1", CompletionMode::Popup);

		let result = correlator
			.correlate(&CallbackParams::default().with_state("s1").with_code("abc123"))
			.expect("Callback should correlate.");

		assert_eq!(result.platform_id, PlatformId::Instagram);
		assert_eq!(result.portfolio_id.as_ref(), "p1");
		assert_eq!(result.code.secret(), "abc123");
		assert_eq!(result.completion, CompletionMode::Popup);
	}

	#[test]
	fn missing_code_fails_the_claimed_request() {
		let (correlator, pending) = correlator(CorrelationPolicy::default());

		register(&pending, "s1", CompletionMode::Redirect);

		let (receiver, _) = pending.subscribe("s1").expect("Registered state should subscribe.");
		let failure = correlator
			.correlate(&CallbackParams::default().with_state("s1"))
			.expect_err("Missing code must be rejected.");

		assert_eq!(failure.error, CorrelationError::MissingField("code"));
		assert_eq!(failure.action(), CompletionAction::Navigate("/portfolios".into()));
		assert!(matches!(
			&*receiver.borrow(),
			AttemptStatus::Failed { kind: ErrorKind::MissingCallbackData, .. }
		));

		let replay = correlator
			.correlate(&CallbackParams::default().with_state("s1").with_code("abc123"))
			.expect_err("Replayed callbacks must be rejected.");

		assert_eq!(replay.error, CorrelationError::AlreadyUsed);
	}

	#[test]
	fn access_denied_maps_to_user_cancelled() {
		let (correlator, pending) = correlator(CorrelationPolicy::default());

		register(&pending, "s1", CompletionMode::Popup);

		let failure = correlator
			.correlate(&CallbackParams::default().with_state("s1").with_error(ACCESS_DENIED, None))
			.expect_err("Denied callbacks must fail.");

		assert_eq!(failure.error.kind(), ErrorKind::UserCancelled);
		assert_eq!(failure.action(), CompletionAction::CloseWindow);
		assert!(matches!(Error::from(failure.error), Error::UserCancelled { .. }));
	}

	#[test]
	fn contradicting_parameters_are_rejected() {
		let (correlator, pending) = correlator(CorrelationPolicy::default());

		register(&pending, "s1", CompletionMode::Popup);

		let failure = correlator
			.correlate(
				&CallbackParams::default().with_state("s1").with_code("c").with_platform("linkedin"),
			)
			.expect_err("Platform mismatch must be rejected.");

		assert_eq!(failure.error, CorrelationError::Mismatch("platform"));
	}

	#[test]
	fn legacy_callbacks_follow_the_policy() {
		let (strict, pending) = correlator(CorrelationPolicy::strict());

		register(&pending, "s1", CompletionMode::Popup);

		let failure = strict
			.correlate(&CallbackParams::default().with_portfolio_id("p1").with_code("c"))
			.expect_err("Strict policy must reject platformless callbacks.");

		assert_eq!(failure.error, CorrelationError::MissingField("platform"));

		let lenient = CallbackCorrelator::new(pending, CorrelationPolicy::default());
		let result = lenient
			.correlate(&CallbackParams::default().with_portfolio_id("p1").with_code("c"))
			.expect("Legacy callback should fall back to Instagram.");

		assert_eq!(result.platform_id, PlatformId::Instagram);
		assert_eq!(result.state, "s1");
	}

	#[test]
	fn redirect_success_navigates_to_portfolio_settings() {
		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");

		assert_eq!(
			CompletionMode::Redirect.action(Some(&portfolio), true),
			CompletionAction::Navigate("/portfolio/p1/settings".into())
		);
		assert_eq!(CompletionMode::Popup.action(Some(&portfolio), true), CompletionAction::CloseWindow);
	}
}
