//! Configuration-injected mapping from platform to adapter.

// self
use crate::{
	_prelude::*,
	config::LinkConfig,
	error::ConfigError,
	http::ProviderHttpClient,
	platform::PlatformId,
	provider::{InstagramAdapter, LinkedinAdapter, ProviderAdapter, ProviderDescriptor},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Adapters keyed by platform.
///
/// Only platforms with configured credentials are registered, so a lookup miss for a known
/// platform is a configuration problem rather than an unsupported platform.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
	adapters: HashMap<PlatformId, Arc<dyn ProviderAdapter>>,
}
impl AdapterRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds production adapters for every configured platform over reqwest.
	#[cfg(feature = "reqwest")]
	pub fn from_config(config: &LinkConfig) -> Result<Self, ConfigError> {
		Self::from_config_with(config, Arc::new(ReqwestHttpClient::default()))
	}

	/// Builds production adapters for every configured platform over a custom transport.
	pub fn from_config_with<C>(config: &LinkConfig, http: Arc<C>) -> Result<Self, ConfigError>
	where
		C: ProviderHttpClient,
	{
		let descriptors = PlatformId::ALL
			.into_iter()
			.filter(|platform| config.credentials(*platform).is_some())
			.map(ProviderDescriptor::for_platform)
			.collect::<Result<Vec<_>, _>>()?;

		Self::from_descriptors(descriptors, config, http)
	}

	/// Builds adapters from explicit descriptors, skipping platforms without credentials.
	pub fn from_descriptors<I, C>(
		descriptors: I,
		config: &LinkConfig,
		http: Arc<C>,
	) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = ProviderDescriptor>,
		C: ProviderHttpClient,
	{
		let mut registry = Self::new();

		for descriptor in descriptors {
			let Some(credentials) = config.credentials(descriptor.platform).cloned() else {
				continue;
			};
			let adapter: Arc<dyn ProviderAdapter> = match descriptor.platform {
				PlatformId::Instagram =>
					Arc::new(InstagramAdapter::new(descriptor, credentials, http.clone())?),
				PlatformId::Linkedin =>
					Arc::new(LinkedinAdapter::new(descriptor, credentials, http.clone())?),
			};

			registry.register(adapter);
		}

		Ok(registry)
	}

	/// Adds (or replaces) the adapter for its platform.
	pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
		self.register(adapter);

		self
	}

	/// Adds (or replaces) the adapter for its platform.
	pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
		self.adapters.insert(adapter.platform(), adapter);
	}

	/// Adapter registered for `platform`.
	pub fn get(&self, platform: PlatformId) -> Option<Arc<dyn ProviderAdapter>> {
		self.adapters.get(&platform).cloned()
	}

	/// Resolves a caller-supplied platform label to its adapter.
	///
	/// Unknown labels yield [`Error::UnsupportedPlatform`]; known platforms without an
	/// adapter yield a configuration error.
	pub fn resolve(&self, platform: &str) -> Result<(PlatformId, Arc<dyn ProviderAdapter>)> {
		let platform = platform.parse::<PlatformId>()?;
		let adapter = self.get(platform).ok_or(ConfigError::MissingCredentials { platform })?;

		Ok((platform, adapter))
	}

	/// Registered platforms, sorted.
	pub fn platforms(&self) -> Vec<PlatformId> {
		let mut platforms = self.adapters.keys().copied().collect::<Vec<_>>();

		platforms.sort();

		platforms
	}
}
impl Debug for AdapterRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AdapterRegistry").field("platforms", &self.platforms()).finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{config::ClientCredentials, error::ErrorKind};

	#[test]
	fn registers_only_configured_platforms() {
		let config = LinkConfig::default()
			.with_credentials(PlatformId::Linkedin, ClientCredentials::new("li", "secret"));
		let registry = AdapterRegistry::from_config(&config).expect("Registry should build.");

		assert_eq!(registry.platforms(), vec![PlatformId::Linkedin]);

		let (platform, adapter) = registry.resolve("LinkedIn").expect("LinkedIn should resolve.");

		assert_eq!(platform, PlatformId::Linkedin);
		assert_eq!(adapter.platform(), PlatformId::Linkedin);

		let missing = registry.resolve("instagram").expect_err("Unconfigured platforms must fail.");

		assert_eq!(missing.kind(), ErrorKind::Configuration);

		let unknown = registry.resolve("myspace").expect_err("Unknown platforms must fail.");

		assert_eq!(unknown.kind(), ErrorKind::UnsupportedPlatform);
	}
}
