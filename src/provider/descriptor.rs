//! Provider descriptor data structures shared by the adapters.
//!
//! A descriptor is validated metadata: HTTPS-only endpoints, the API base used for identity
//! and metrics lookups, default scopes, and provider quirks.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError, platform::PlatformId};

const META_AUTHORIZATION_URL: &str = "https://www.facebook.com/v18.0/dialog/oauth";
const META_TOKEN_URL: &str = "https://graph.facebook.com/v18.0/oauth/access_token";
const META_GRAPH_URL: &str = "https://graph.facebook.com/v18.0/";
const INSTAGRAM_SCOPES: [&str; 2] = ["instagram_basic", "pages_show_list"];
const LINKEDIN_AUTHORIZATION_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const LINKEDIN_API_URL: &str = "https://api.linkedin.com/v2/";
const LINKEDIN_SCOPES: [&str; 2] = ["r_liteprofile", "rw_organization_admin"];

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint opened in the popup.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
	/// Base URL for identity and metrics lookups.
	pub api_base: Url,
}

/// Immutable provider descriptor consumed by adapters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Platform described.
	pub platform: PlatformId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Scopes requested when the caller does not ask for specific ones.
	pub default_scopes: ScopeSet,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided platform.
	pub fn builder(platform: PlatformId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(platform)
	}

	/// Production descriptor for Instagram through Meta Graph API v18.0.
	pub fn instagram() -> Result<Self, ConfigError> {
		Self::production(
			PlatformId::Instagram,
			META_AUTHORIZATION_URL,
			META_TOKEN_URL,
			META_GRAPH_URL,
			&INSTAGRAM_SCOPES,
		)
	}

	/// Production descriptor for LinkedIn API v2.
	pub fn linkedin() -> Result<Self, ConfigError> {
		Self::production(
			PlatformId::Linkedin,
			LINKEDIN_AUTHORIZATION_URL,
			LINKEDIN_TOKEN_URL,
			LINKEDIN_API_URL,
			&LINKEDIN_SCOPES,
		)
	}

	/// Production descriptor for `platform`.
	pub fn for_platform(platform: PlatformId) -> Result<Self, ConfigError> {
		match platform {
			PlatformId::Instagram => Self::instagram(),
			PlatformId::Linkedin => Self::linkedin(),
		}
	}

	/// Resolves an API URL by appending `segments` to the API base.
	///
	/// Each segment is percent-encoded as a single path segment.
	pub fn api_url<'a>(
		&self,
		segments: impl IntoIterator<Item = &'a str>,
	) -> Result<Url, ProviderDescriptorError> {
		let mut url = self.endpoints.api_base.clone();

		url.path_segments_mut()
			.map_err(|_| ProviderDescriptorError::InvalidApiBase {
				url: self.endpoints.api_base.to_string(),
			})?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	fn production(
		platform: PlatformId,
		authorization: &str,
		token: &str,
		api_base: &str,
		scopes: &[&str],
	) -> Result<Self, ConfigError> {
		let parse = |endpoint: &'static str, raw: &str| {
			Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
		};

		Ok(Self::builder(platform)
			.authorization_endpoint(parse("authorization", authorization)?)
			.token_endpoint(parse("token", token)?)
			.api_base(parse("api", api_base)?)
			.default_scopes(ScopeSet::new(scopes.iter().copied())?)
			.build()?)
	}
}
