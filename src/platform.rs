//! Supported social platforms.

// self
use crate::_prelude::*;

/// Raised when a caller names a platform the crate has no adapter for.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Platform `{platform}` is not supported.")]
pub struct UnsupportedPlatform {
	/// Platform label supplied by the caller.
	pub platform: String,
}

/// External social network a portfolio can link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PlatformId {
	/// Instagram Business account reached through the Meta Graph API.
	Instagram,
	/// LinkedIn Company Page.
	Linkedin,
}
impl PlatformId {
	/// Every platform the crate ships an adapter for.
	pub const ALL: [PlatformId; 2] = [PlatformId::Instagram, PlatformId::Linkedin];

	/// Returns the stable label used in URLs, store keys, and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			PlatformId::Instagram => "instagram",
			PlatformId::Linkedin => "linkedin",
		}
	}

	/// Human-facing product name.
	pub const fn display_name(self) -> &'static str {
		match self {
			PlatformId::Instagram => "Instagram",
			PlatformId::Linkedin => "LinkedIn",
		}
	}
}
impl AsRef<str> for PlatformId {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Display for PlatformId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for PlatformId {
	type Err = UnsupportedPlatform;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();

		PlatformId::ALL
			.into_iter()
			.find(|platform| platform.as_str().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| UnsupportedPlatform { platform: trimmed.to_owned() })
	}
}
