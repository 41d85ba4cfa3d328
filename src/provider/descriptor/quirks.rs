// self
use crate::{_prelude::*, platform::PlatformId};

/// Where API lookups carry the access token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPlacement {
	/// `access_token` query parameter (Meta Graph API).
	Query,
	#[default]
	/// `Authorization: Bearer` header.
	Bearer,
}

/// Provider-specific quirks that influence how adapters shape requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
	/// How API lookups authenticate.
	pub token_placement: TokenPlacement,
}
impl ProviderQuirks {
	/// Quirks observed for the platform's production API.
	pub const fn for_platform(platform: PlatformId) -> Self {
		match platform {
			PlatformId::Instagram =>
				Self { scope_delimiter: ',', token_placement: TokenPlacement::Query },
			PlatformId::Linkedin =>
				Self { scope_delimiter: ' ', token_placement: TokenPlacement::Bearer },
		}
	}
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { scope_delimiter: ' ', token_placement: TokenPlacement::default() }
	}
}
