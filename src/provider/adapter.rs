//! Contract every platform adapter implements.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderUserId, ScopeSet},
	error::{ConfigError, TokenExchangeError},
	oauth2::AuthorizationCode,
	platform::PlatformId,
};

/// Boxed future returned by [`ProviderAdapter`] methods.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Provider-specific half of the link protocol.
///
/// Adapters are stateless apart from their descriptor, credentials, and transport, so one
/// instance serves every concurrent attempt for its platform. Methods return boxed futures so
/// the trait stays object safe and runtime agnostic.
pub trait ProviderAdapter
where
	Self: Debug + Send + Sync,
{
	/// Platform served by this adapter.
	fn platform(&self) -> PlatformId;

	/// Builds the URL opened in the popup. Pure; performs no I/O.
	///
	/// Falls back to the descriptor's default scopes when `requested_scopes` is `None`.
	fn build_authorization_url(
		&self,
		redirect_uri: &Url,
		requested_scopes: Option<&ScopeSet>,
		state: &str,
	) -> Result<Url, ConfigError>;

	/// Exchanges `code` for an access token and resolves the provider account behind it.
	///
	/// The code is single-use: callers must not retry a failed exchange with the same value.
	fn exchange_code<'a>(
		&'a self,
		code: &'a AuthorizationCode,
		redirect_uri: &'a Url,
	) -> AdapterFuture<'a, Result<TokenExchange, TokenExchangeError>>;

	/// Fetches follower and media counts. Failures downgrade to [`MetricsUnavailable`].
	fn fetch_metrics<'a>(
		&'a self,
		access_token: &'a AccessToken,
		provider_user_id: &'a ProviderUserId,
	) -> AdapterFuture<'a, Result<MetricsSnapshot, MetricsUnavailable>>;
}

/// Outcome of a successful code exchange. Never persisted verbatim.
#[derive(Clone, Debug)]
pub struct TokenExchange {
	/// Token used for the follow-up lookups; dropped after the attempt.
	pub access_token: AccessToken,
	/// Provider-side account identifier.
	pub provider_user_id: ProviderUserId,
	/// Account name reported by the provider, when available.
	pub provider_display_name: Option<String>,
}

/// Best-effort account metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
	/// Follower count.
	pub follower_count: u64,
	/// Media count; `None` when the provider does not expose it.
	pub media_count: Option<u64>,
}

/// Non-fatal metrics failure; the connection is still committed with zeroed metrics.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{platform} metrics unavailable: {reason}")]
pub struct MetricsUnavailable {
	/// Platform whose lookup failed.
	pub platform: PlatformId,
	/// Why the lookup failed.
	pub reason: MetricsUnavailableReason,
}

/// Why a metrics lookup produced no data.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MetricsUnavailableReason {
	/// Request never produced a response.
	#[error("transport failure: {0}")]
	Transport(String),
	/// Provider answered with a non-2xx status.
	#[error("provider returned HTTP {0}")]
	Status(u16),
	/// Response body could not be decoded.
	#[error("malformed response: {0}")]
	Malformed(String),
	/// A field required to continue the lookup chain was absent.
	#[error("response is missing `{0}`")]
	MissingField(&'static str),
	/// Lookup exceeded the metrics timeout.
	#[error("lookup timed out")]
	Timeout,
}
impl MetricsUnavailableReason {
	/// Stable label for metric and span fields.
	pub const fn label(&self) -> &'static str {
		match self {
			MetricsUnavailableReason::Transport(_) => "transport",
			MetricsUnavailableReason::Status(_) => "status",
			MetricsUnavailableReason::Malformed(_) => "malformed",
			MetricsUnavailableReason::MissingField(_) => "missing_field",
			MetricsUnavailableReason::Timeout => "timeout",
		}
	}
}
