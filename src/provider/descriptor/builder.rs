// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	platform::PlatformId,
	provider::{ProviderDescriptor, ProviderEndpoints, ProviderQuirks, TokenPlacement},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required to start the handshake.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is required to exchange codes.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base is required for identity and metrics lookups.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The API base must be usable as a path prefix.
	#[error("The API base cannot carry a query or fragment: {url}.")]
	InvalidApiBase {
		/// API base that failed validation.
		url: String,
	},
	/// Descriptor was handed to an adapter for a different platform.
	#[error("Descriptor for {actual} cannot back the {expected} adapter.")]
	PlatformMismatch {
		/// Platform the adapter serves.
		expected: PlatformId,
		/// Platform the descriptor describes.
		actual: PlatformId,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Platform the descriptor describes.
	pub platform: PlatformId,
	/// Authorization endpoint opened in the popup.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for the code exchange.
	pub token_endpoint: Option<Url>,
	/// Base URL for identity and metrics lookups.
	pub api_base: Option<Url>,
	/// Scopes requested when the caller does not ask for specific ones.
	pub default_scopes: ScopeSet,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided platform and its known quirks.
	pub fn new(platform: PlatformId) -> Self {
		Self {
			platform,
			authorization_endpoint: None,
			token_endpoint: None,
			api_base: None,
			default_scopes: ScopeSet::default(),
			quirks: ProviderQuirks::for_platform(platform),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the scopes requested by default.
	pub fn default_scopes(mut self, scopes: ScopeSet) -> Self {
		self.default_scopes = scopes;

		self
	}

	/// Overrides the scope delimiter.
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.quirks.scope_delimiter = delimiter;

		self
	}

	/// Overrides where lookups carry the access token.
	pub fn token_placement(mut self, placement: TokenPlacement) -> Self {
		self.quirks.token_placement = placement;

		self
	}

	/// Overrides the provider quirks.
	pub fn quirks(mut self, quirks: ProviderQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?;
		let descriptor = ProviderDescriptor {
			platform: self.platform,
			endpoints: ProviderEndpoints { authorization, token, api_base },
			default_scopes: self.default_scopes,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api", &self.endpoints.api_base)?;

		if self.endpoints.api_base.query().is_some()
			|| self.endpoints.api_base.fragment().is_some()
			|| self.endpoints.api_base.cannot_be_a_base()
		{
			return Err(ProviderDescriptorError::InvalidApiBase {
				url: self.endpoints.api_base.to_string(),
			});
		}

		validate_scope_delimiter(self.quirks.scope_delimiter)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_scope_delimiter(delimiter: char) -> Result<(), ProviderDescriptorError> {
	if delimiter.is_control() {
		Err(ProviderDescriptorError::InvalidScopeDelimiter { delimiter })
	} else {
		Ok(())
	}
}
