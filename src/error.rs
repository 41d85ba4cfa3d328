//! Error taxonomy shared by adapters, the correlator, the orchestrator, and stores.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, PortfolioId, ScopeValidationError},
	flows::{InvalidTransition, PendingCommit},
	platform::{PlatformId, UnsupportedPlatform},
	provider::ProviderDescriptorError,
	store::StoreError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced to callers of the link flows.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (credentials, endpoints).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller named a platform without an adapter.
	#[error(transparent)]
	UnsupportedPlatform(#[from] UnsupportedPlatform),
	/// The provider redirect could not be tied to a usable authorization request.
	#[error("Callback is missing required data: {detail}.")]
	MissingCallbackData {
		/// What was missing or inconsistent.
		detail: String,
	},
	/// Provider rejected the authorization code or its identity lookup failed.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// The commit failed after the provider authorized the app.
	///
	/// The provider now considers the app authorized while the stored record does not;
	/// pass `pending` to [`LinkOrchestrator::retry_commit`](crate::flows::LinkOrchestrator::retry_commit)
	/// to re-drive the commit alone.
	#[error("Connection could not be saved: {source}")]
	Persistence {
		/// Store failure.
		#[source]
		source: StoreError,
		/// Write that must be replayed.
		pending: Box<PendingCommit>,
	},
	/// The user closed the popup, denied access, or the request expired.
	#[error("Authorization was cancelled: {reason}.")]
	UserCancelled {
		/// Why the attempt ended.
		reason: String,
	},
	/// Analytics were requested for a platform that is not connected.
	#[error("{platform_id} is not connected for portfolio {portfolio_id}.")]
	NotConnected {
		/// Portfolio that was queried.
		portfolio_id: PortfolioId,
		/// Platform that was queried.
		platform_id: PlatformId,
	},
	/// Store read failure outside the commit step.
	#[error("{0}")]
	Storage(#[from] StoreError),
	/// Internal state machine misuse.
	#[error(transparent)]
	InvalidTransition(#[from] InvalidTransition),
	/// Terminal status observed while awaiting an attempt started elsewhere.
	#[error("Connection attempt ended with {kind}: {message}")]
	AttemptFailed {
		/// Classification published by the attempt.
		kind: ErrorKind,
		/// User-facing message published by the attempt.
		message: String,
		/// Write to replay when the attempt failed at the commit.
		pending: Option<Box<PendingCommit>>,
	},
}
impl Error {
	/// Classifies the error into the stable taxonomy label exposed to the UI.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Config(_) => ErrorKind::Configuration,
			Error::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
			Error::MissingCallbackData { .. } => ErrorKind::MissingCallbackData,
			Error::TokenExchange(_) => ErrorKind::TokenExchange,
			Error::Persistence { .. } => ErrorKind::Persistence,
			Error::UserCancelled { .. } => ErrorKind::UserCancelled,
			Error::NotConnected { .. } => ErrorKind::NotConnected,
			Error::Storage(_) => ErrorKind::Storage,
			Error::InvalidTransition(_) => ErrorKind::Internal,
			Error::AttemptFailed { kind, .. } => *kind,
		}
	}

	/// Message suitable for a toast.
	///
	/// Provider-agnostic, except for token-exchange and missing-data failures whose details
	/// are directly actionable.
	pub fn user_message(&self) -> String {
		match self {
			Error::Config(_) => "This platform is not configured. Contact support.".into(),
			Error::UnsupportedPlatform(err) => err.to_string(),
			Error::MissingCallbackData { detail } =>
				format!("Missing authorization data: {detail}. Please start the connection again."),
			Error::TokenExchange(err) => format!("Failed to connect account: {}", err.message),
			Error::Persistence { .. } =>
				"The account was authorized but the connection could not be saved. Please retry."
					.into(),
			Error::UserCancelled { .. } => "Connection was cancelled.".into(),
			Error::NotConnected { platform_id, .. } =>
				format!("{} is not connected.", platform_id.display_name()),
			Error::Storage(_) | Error::InvalidTransition(_) =>
				"Something went wrong. Please try again.".into(),
			Error::AttemptFailed { message, .. } => message.clone(),
		}
	}

	/// Commit that must be replayed after a persistence failure, whether raised here or
	/// observed through [`Error::AttemptFailed`].
	pub fn pending_commit(&self) -> Option<&PendingCommit> {
		match self {
			Error::Persistence { pending, .. } => Some(pending.as_ref()),
			Error::AttemptFailed { pending, .. } => pending.as_deref(),
			_ => None,
		}
	}
}

/// Stable error labels shared with the UI collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Missing or invalid configuration.
	Configuration,
	/// Unknown platform.
	UnsupportedPlatform,
	/// Malformed or unmatched callback.
	MissingCallbackData,
	/// Provider rejected the exchange.
	TokenExchange,
	/// Commit failed after a successful exchange.
	Persistence,
	/// Popup closed, access denied, or request expired.
	UserCancelled,
	/// Platform not connected.
	NotConnected,
	/// Store read failure.
	Storage,
	/// Internal invariant violation.
	Internal,
}
impl ErrorKind {
	/// Returns a stable label suitable for JSON, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Configuration => "configuration",
			ErrorKind::UnsupportedPlatform => "unsupported_platform",
			ErrorKind::MissingCallbackData => "missing_callback_data",
			ErrorKind::TokenExchange => "token_exchange",
			ErrorKind::Persistence => "persistence",
			ErrorKind::UserCancelled => "user_cancelled",
			ErrorKind::NotConnected => "not_connected",
			ErrorKind::Storage => "storage",
			ErrorKind::Internal => "internal",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No credentials were configured for the platform.
	#[error("Credentials for {platform} are not configured.")]
	MissingCredentials {
		/// Platform lacking credentials.
		platform: PlatformId,
	},
	/// Only one half of a credential pair was provided.
	#[error("Environment variable `{variable}` for {platform} is not set.")]
	PartialCredentials {
		/// Platform with the incomplete pair.
		platform: PlatformId,
		/// Variable that is missing.
		variable: &'static str,
	},
	/// The configured client identifier is empty.
	#[error("Client identifier for {platform} is empty.")]
	MissingClientId {
		/// Platform with the empty identifier.
		platform: PlatformId,
	},
	/// A built-in or configured endpoint is not a valid URL.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Descriptor validation failed.
	#[error(transparent)]
	InvalidDescriptor(#[from] ProviderDescriptorError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Step of the exchange that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStage {
	/// POST to the token endpoint.
	Token,
	/// Identity lookup performed with the fresh token.
	Identity,
}
impl Display for ExchangeStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			ExchangeStage::Token => "token",
			ExchangeStage::Identity => "identity",
		})
	}
}

/// Provider rejected or garbled the token exchange; terminal for the attempt.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{platform} {stage} request failed: {message}")]
pub struct TokenExchangeError {
	/// Provider that failed.
	pub platform: PlatformId,
	/// Step that failed.
	pub stage: ExchangeStage,
	/// HTTP status, when a response arrived.
	pub status: Option<u16>,
	/// Raw provider message (or transport description).
	pub message: String,
}
impl TokenExchangeError {
	/// Provider answered with an error or an unusable payload.
	pub fn rejected(
		platform: PlatformId,
		stage: ExchangeStage,
		status: Option<u16>,
		message: impl Into<String>,
	) -> Self {
		Self { platform, stage, status, message: message.into() }
	}

	/// Request never produced a response.
	pub fn transport(platform: PlatformId, stage: ExchangeStage, err: &TransportError) -> Self {
		Self { platform, stage, status: None, message: err.detail() }
	}

	/// Provider did not answer within the exchange timeout.
	pub fn timeout(platform: PlatformId, limit: Duration) -> Self {
		Self {
			platform,
			stage: ExchangeStage::Token,
			status: None,
			message: format!("provider did not respond within {limit}"),
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Display text followed by every underlying cause, joined with `: `.
	pub fn detail(&self) -> String {
		let mut detail = self.to_string().trim_end_matches('.').to_owned();
		let mut cause = self.source();

		while let Some(err) = cause {
			detail.push_str(": ");
			detail.push_str(&err.to_string());
			cause = err.source();
		}

		detail
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		Error::MissingCallbackData { detail: e.to_string() }
	}
}
