//! Request plumbing shared by the platform adapters.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	config::ClientCredentials,
	error::{ConfigError, ExchangeStage, TokenExchangeError},
	http::{self, HttpResponse, ProviderHttpClient},
	oauth2::AuthorizationCode,
	platform::PlatformId,
	provider::{MetricsUnavailableReason, ProviderDescriptor, TokenPlacement},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Failure of a single API lookup, before it is mapped into the caller's taxonomy.
#[derive(Debug)]
pub(crate) enum LookupError {
	Request(String),
	Transport(String),
	Status { status: u16, message: String },
	Malformed { status: u16, message: String },
}
impl LookupError {
	pub(crate) fn into_exchange_error(self, platform: PlatformId) -> TokenExchangeError {
		let stage = ExchangeStage::Identity;

		match self {
			LookupError::Request(message) | LookupError::Transport(message) =>
				TokenExchangeError::rejected(platform, stage, None, message),
			LookupError::Status { status, message } =>
				TokenExchangeError::rejected(platform, stage, Some(status), message),
			LookupError::Malformed { status, message } => TokenExchangeError::rejected(
				platform,
				stage,
				Some(status),
				format!("malformed identity response: {message}"),
			),
		}
	}

	pub(crate) fn into_metrics_reason(self) -> MetricsUnavailableReason {
		match self {
			LookupError::Request(message) | LookupError::Transport(message) =>
				MetricsUnavailableReason::Transport(message),
			LookupError::Status { status, .. } => MetricsUnavailableReason::Status(status),
			LookupError::Malformed { message, .. } => MetricsUnavailableReason::Malformed(message),
		}
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
}

/// Descriptor, credentials, and transport bundled for one platform.
pub(crate) struct ProviderClient<C>
where
	C: ?Sized + ProviderHttpClient,
{
	pub(crate) descriptor: ProviderDescriptor,
	credentials: ClientCredentials,
	http: Arc<C>,
}
impl<C> ProviderClient<C>
where
	C: ?Sized + ProviderHttpClient,
{
	pub(crate) fn new(
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		http: Arc<C>,
	) -> Self {
		Self { descriptor, credentials, http }
	}

	pub(crate) fn platform(&self) -> PlatformId {
		self.descriptor.platform
	}

	pub(crate) fn authorization_url(
		&self,
		redirect_uri: &Url,
		requested_scopes: Option<&ScopeSet>,
		state: &str,
	) -> Result<Url, ConfigError> {
		let client_id = self.credentials.client_id.as_str();

		if client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId { platform: self.platform() });
		}

		let scopes = requested_scopes.unwrap_or(&self.descriptor.default_scopes);
		let mut url = self.descriptor.endpoints.authorization.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("client_id", client_id)
				.append_pair("redirect_uri", redirect_uri.as_str())
				.append_pair("response_type", "code");

			if let Some(scope) = scopes.joined(self.descriptor.quirks.scope_delimiter) {
				pairs.append_pair("scope", &scope);
			}

			pairs.append_pair("state", state);
		}

		Ok(url)
	}

	/// POSTs the code to the token endpoint and returns the access token.
	pub(crate) async fn exchange_token(
		&self,
		code: &AuthorizationCode,
		redirect_uri: &Url,
	) -> Result<AccessToken, TokenExchangeError> {
		let platform = self.platform();
		let stage = ExchangeStage::Token;
		let fields = [
			("client_id", self.credentials.client_id.as_str()),
			("client_secret", self.credentials.client_secret.secret().as_str()),
			("grant_type", "authorization_code"),
			("redirect_uri", redirect_uri.as_str()),
			("code", code.secret().as_str()),
		];
		let request = http::form_post(&self.descriptor.endpoints.token, &fields)
			.map_err(|e| TokenExchangeError::rejected(platform, stage, None, e.to_string()))?;
		let response = self
			.http
			.execute(request)
			.await
			.map_err(|e| TokenExchangeError::transport(platform, stage, &e))?;
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(TokenExchangeError::rejected(
				platform,
				stage,
				Some(status),
				provider_message(response.body()),
			));
		}

		let token = decode::<TokenResponse>(&response).map_err(|message| {
			TokenExchangeError::rejected(
				platform,
				stage,
				Some(status),
				format!("malformed token response: {message}"),
			)
		})?;

		if token.access_token.is_empty() {
			return Err(TokenExchangeError::rejected(
				platform,
				stage,
				Some(status),
				"token response did not include an access token",
			));
		}

		Ok(AccessToken::new(token.access_token))
	}

	/// GETs `segments` under the API base and decodes the JSON body.
	pub(crate) async fn get_json<T>(
		&self,
		segments: &[&str],
		query: &[(&str, &str)],
		token: &AccessToken,
	) -> Result<T, LookupError>
	where
		T: DeserializeOwned,
	{
		let mut url = self
			.descriptor
			.api_url(segments.iter().copied())
			.map_err(|e| LookupError::Request(e.to_string()))?;
		let placement = self.descriptor.quirks.token_placement;
		let mut pairs = query.to_vec();

		if placement == TokenPlacement::Query {
			pairs.push(("access_token", token.expose()));
		}
		if !pairs.is_empty() {
			url.query_pairs_mut().extend_pairs(pairs);
		}

		let bearer = (placement == TokenPlacement::Bearer).then_some(token);
		let request = http::get(&url, bearer).map_err(|e| LookupError::Request(e.to_string()))?;
		let response =
			self.http.execute(request).await.map_err(|e| LookupError::Transport(e.detail()))?;
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(LookupError::Status { status, message: provider_message(response.body()) });
		}

		decode(&response).map_err(|message| LookupError::Malformed { status, message })
	}
}

fn decode<T>(response: &HttpResponse) -> Result<T, String>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|e| e.to_string())
}

/// Extracts the most specific error message a provider put in an error body.
///
/// Tries `error_description`, Graph's `error.message`, LinkedIn's `message`, and a bare
/// `error` string before falling back to a truncated body preview.
pub(crate) fn provider_message(body: &[u8]) -> String {
	let structured = serde_json::from_slice::<serde_json::Value>(body).ok().and_then(|value| {
		value
			.get("error_description")
			.and_then(serde_json::Value::as_str)
			.or_else(|| value.pointer("/error/message").and_then(serde_json::Value::as_str))
			.or_else(|| value.get("message").and_then(serde_json::Value::as_str))
			.or_else(|| value.get("error").and_then(serde_json::Value::as_str))
			.map(str::to_owned)
	});

	structured.unwrap_or_else(|| body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return "empty response body".into();
	}
	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.to_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
