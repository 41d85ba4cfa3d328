//! Process-wide configuration: provider credentials, timeouts, and callback policy.

// crates.io
use oauth2::{ClientId, ClientSecret};
// self
use crate::{_prelude::*, callback::CorrelationPolicy, error::ConfigError, platform::PlatformId};

const META_APP_ID: &str = "META_APP_ID";
const META_APP_SECRET: &str = "META_APP_SECRET";
const LINKEDIN_CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
const LINKEDIN_CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";

/// OAuth client registration for one platform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// Public application identifier.
	pub client_id: ClientId,
	/// Application secret; redacted in `Debug`.
	pub client_secret: ClientSecret,
}
impl ClientCredentials {
	/// Wraps a client id/secret pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: ClientId::new(client_id.into()),
			client_secret: ClientSecret::new(client_secret.into()),
		}
	}
}

/// Link configuration loaded once at startup and shared read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
	/// Meta application used for Instagram.
	pub instagram: Option<ClientCredentials>,
	/// LinkedIn application.
	pub linkedin: Option<ClientCredentials>,
	/// Upper bound for the token exchange plus identity lookup.
	pub exchange_timeout: Duration,
	/// Upper bound for the metrics lookup chain.
	pub metrics_timeout: Duration,
	/// How long an issued authorization request accepts its callback.
	pub authorization_ttl: Duration,
	/// How callbacks without a `state` parameter are matched.
	pub correlation: CorrelationPolicy,
}
impl LinkConfig {
	/// Default bound for the token exchange.
	pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::seconds(10);
	/// Default bound for the metrics lookups.
	pub const DEFAULT_METRICS_TIMEOUT: Duration = Duration::seconds(5);
	/// Default lifetime of an authorization request.
	pub const DEFAULT_AUTHORIZATION_TTL: Duration = Duration::minutes(5);

	/// Loads credentials from `META_APP_ID`/`META_APP_SECRET` and
	/// `LINKEDIN_CLIENT_ID`/`LINKEDIN_CLIENT_SECRET`.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads credentials through `lookup`; a half-set pair is rejected.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let pair = |platform: PlatformId, id_var: &'static str, secret_var: &'static str| {
			let non_empty =
				|name: &str| lookup(name).filter(|value: &String| !value.trim().is_empty());

			match (non_empty(id_var), non_empty(secret_var)) {
				(Some(id), Some(secret)) => Ok(Some(ClientCredentials::new(id, secret))),
				(None, None) => Ok(None),
				(None, Some(_)) => Err(ConfigError::PartialCredentials { platform, variable: id_var }),
				(Some(_), None) =>
					Err(ConfigError::PartialCredentials { platform, variable: secret_var }),
			}
		};

		Ok(Self {
			instagram: pair(PlatformId::Instagram, META_APP_ID, META_APP_SECRET)?,
			linkedin: pair(PlatformId::Linkedin, LINKEDIN_CLIENT_ID, LINKEDIN_CLIENT_SECRET)?,
			..Self::default()
		})
	}

	/// Credentials configured for `platform`, if any.
	pub fn credentials(&self, platform: PlatformId) -> Option<&ClientCredentials> {
		match platform {
			PlatformId::Instagram => self.instagram.as_ref(),
			PlatformId::Linkedin => self.linkedin.as_ref(),
		}
	}

	/// Credentials for `platform`, failing when they are not configured.
	pub fn require(&self, platform: PlatformId) -> Result<&ClientCredentials, ConfigError> {
		self.credentials(platform).ok_or(ConfigError::MissingCredentials { platform })
	}

	/// Sets the credentials for `platform`.
	pub fn with_credentials(mut self, platform: PlatformId, credentials: ClientCredentials) -> Self {
		match platform {
			PlatformId::Instagram => self.instagram = Some(credentials),
			PlatformId::Linkedin => self.linkedin = Some(credentials),
		}

		self
	}

	/// Overrides the token exchange timeout.
	pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
		self.exchange_timeout = timeout;

		self
	}

	/// Overrides the metrics timeout.
	pub fn with_metrics_timeout(mut self, timeout: Duration) -> Self {
		self.metrics_timeout = timeout;

		self
	}

	/// Overrides the authorization request lifetime.
	pub fn with_authorization_ttl(mut self, ttl: Duration) -> Self {
		self.authorization_ttl = ttl;

		self
	}

	/// Overrides the callback correlation policy.
	pub fn with_correlation(mut self, policy: CorrelationPolicy) -> Self {
		self.correlation = policy;

		self
	}
}
impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			instagram: None,
			linkedin: None,
			exchange_timeout: Self::DEFAULT_EXCHANGE_TIMEOUT,
			metrics_timeout: Self::DEFAULT_METRICS_TIMEOUT,
			authorization_ttl: Self::DEFAULT_AUTHORIZATION_TTL,
			correlation: CorrelationPolicy::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
		move |name: &str| vars.iter().find(|(key, _)| *key == name).map(|(_, value)| (*value).to_owned())
	}

	#[test]
	fn loads_complete_pairs_and_skips_absent_ones() {
		let config = LinkConfig::from_lookup(lookup(&[
			("META_APP_ID", "123"),
			("META_APP_SECRET", "shh"),
		]))
		.expect("Complete pairs should load.");
		let instagram = config.require(PlatformId::Instagram).expect("Instagram should be set.");

		assert_eq!(instagram.client_id.as_str(), "123");
		assert_eq!(instagram.client_secret.secret(), "shh");
		assert!(config.credentials(PlatformId::Linkedin).is_none());
		assert!(matches!(
			config.require(PlatformId::Linkedin),
			Err(ConfigError::MissingCredentials { platform: PlatformId::Linkedin })
		));
		assert_eq!(config.exchange_timeout, Duration::seconds(10));
		assert_eq!(config.metrics_timeout, Duration::seconds(5));
		assert_eq!(config.authorization_ttl, Duration::minutes(5));
	}

	#[test]
	fn half_set_pairs_are_rejected() {
		let err = LinkConfig::from_lookup(lookup(&[("LINKEDIN_CLIENT_ID", "li")]))
			.expect_err("A client id without a secret must be rejected.");

		assert!(matches!(
			err,
			ConfigError::PartialCredentials {
				platform: PlatformId::Linkedin,
				variable: "LINKEDIN_CLIENT_SECRET"
			}
		));

		let err = LinkConfig::from_lookup(lookup(&[("META_APP_SECRET", "shh"), ("META_APP_ID", " ")]))
			.expect_err("Blank ids count as unset.");

		assert!(matches!(err, ConfigError::PartialCredentials { variable: "META_APP_ID", .. }));
	}

	#[test]
	fn secrets_are_redacted_in_debug_output() {
		let config = LinkConfig::default()
			.with_credentials(PlatformId::Linkedin, ClientCredentials::new("li", "top-secret"));

		assert!(!format!("{config:?}").contains("top-secret"));
	}
}
