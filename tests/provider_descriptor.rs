#![cfg(feature = "reqwest")]

// self
use portfolio_link::{
	_preludet::*,
	auth::ScopeSet,
	config::{ClientCredentials, LinkConfig},
	error::ConfigError,
	platform::PlatformId,
	provider::{
		AdapterRegistry, InstagramAdapter, LinkedinAdapter, ProviderAdapter, ProviderDescriptor,
		ProviderDescriptorBuilder, ProviderDescriptorError, TokenPlacement,
	},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse provider URL fixture.")
}

fn secure_builder(platform: PlatformId) -> ProviderDescriptorBuilder {
	ProviderDescriptor::builder(platform)
		.authorization_endpoint(url("https://example.com/auth"))
		.token_endpoint(url("https://example.com/token"))
		.api_base(url("https://api.example.com/v1/"))
}

#[test]
fn descriptor_rejects_insecure_or_incomplete_endpoints() {
	let err = ProviderDescriptor::builder(PlatformId::Instagram)
		.authorization_endpoint(url("https://example.com/auth"))
		.build()
		.expect_err("Descriptor builder should require a token endpoint.");

	assert!(matches!(err, ProviderDescriptorError::MissingTokenEndpoint));

	let err = secure_builder(PlatformId::Instagram)
		.authorization_endpoint(url("http://example.com/auth"))
		.build()
		.expect_err("Descriptor builder should reject insecure authorization endpoints.");

	assert!(matches!(
		err,
		ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
	));

	let err = secure_builder(PlatformId::Linkedin)
		.api_base(url("https://api.example.com/v1/?debug=1"))
		.build()
		.expect_err("API bases with a query should be rejected.");

	assert!(matches!(err, ProviderDescriptorError::InvalidApiBase { .. }));

	let err = secure_builder(PlatformId::Linkedin)
		.scope_delimiter('\n')
		.build()
		.expect_err("Control characters cannot delimit scopes.");

	assert!(matches!(err, ProviderDescriptorError::InvalidScopeDelimiter { delimiter: '\n' }));
}

#[test]
fn builder_seeds_platform_quirks_and_allows_overrides() {
	let instagram = secure_builder(PlatformId::Instagram)
		.build()
		.expect("Secure Instagram descriptor should build.");

	assert_eq!(instagram.quirks.scope_delimiter, ',');
	assert_eq!(instagram.quirks.token_placement, TokenPlacement::Query);

	let overridden = secure_builder(PlatformId::Instagram)
		.scope_delimiter(' ')
		.token_placement(TokenPlacement::Bearer)
		.build()
		.expect("Quirk overrides should build.");

	assert_eq!(overridden.quirks.scope_delimiter, ' ');
	assert_eq!(overridden.quirks.token_placement, TokenPlacement::Bearer);
	assert_eq!(
		overridden.api_url(["me", "accounts"]).expect("API URL should resolve.").as_str(),
		"https://api.example.com/v1/me/accounts"
	);
}

#[test]
fn adapters_reject_descriptors_for_other_platforms() {
	let http = Arc::new(test_reqwest_http_client());
	let linkedin = ProviderDescriptor::linkedin().expect("LinkedIn descriptor should build.");
	let err = InstagramAdapter::new(
		linkedin,
		ClientCredentials::new(INSTAGRAM_CLIENT_ID, INSTAGRAM_CLIENT_SECRET),
		http.clone(),
	)
	.expect_err("Instagram adapters must not accept LinkedIn descriptors.");

	assert!(matches!(
		err,
		ConfigError::InvalidDescriptor(ProviderDescriptorError::PlatformMismatch {
			expected: PlatformId::Instagram,
			actual: PlatformId::Linkedin,
		})
	));

	let adapter = LinkedinAdapter::new(
		ProviderDescriptor::linkedin().expect("LinkedIn descriptor should build."),
		ClientCredentials::new("", LINKEDIN_CLIENT_SECRET),
		http,
	)
	.expect("Matching descriptors should build.");
	let err = adapter
		.build_authorization_url(&url("https://app.example.com/cb"), None, "state-1")
		.expect_err("Empty client identifiers must be rejected.");

	assert!(matches!(err, ConfigError::MissingClientId { platform: PlatformId::Linkedin }));
}

#[test]
fn requested_scopes_replace_the_defaults() {
	let adapter = InstagramAdapter::new(
		mock_descriptor(PlatformId::Instagram, "https://mock.example.com"),
		ClientCredentials::new(INSTAGRAM_CLIENT_ID, INSTAGRAM_CLIENT_SECRET),
		Arc::new(test_reqwest_http_client()),
	)
	.expect("Instagram adapter should build.");
	let scopes = ScopeSet::new(["instagram_basic", "instagram_manage_insights"])
		.expect("Scope fixture should be valid.");
	let auth_url = adapter
		.build_authorization_url(&url("https://app.example.com/cb"), Some(&scopes), "state-1")
		.expect("Authorization URL should build.");
	let pairs: HashMap<_, _> = auth_url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("scope"), Some(&"instagram_basic,instagram_manage_insights".into()));
	assert_eq!(pairs.get("state"), Some(&"state-1".into()));
}

#[test]
fn registry_skips_platforms_without_credentials() {
	let config = LinkConfig::default().with_credentials(
		PlatformId::Instagram,
		ClientCredentials::new(INSTAGRAM_CLIENT_ID, INSTAGRAM_CLIENT_SECRET),
	);
	let descriptors =
		PlatformId::ALL.map(|platform| mock_descriptor(platform, "https://mock.example.com"));
	let registry =
		AdapterRegistry::from_descriptors(descriptors, &config, Arc::new(test_reqwest_http_client()))
			.expect("Registry should build.");

	assert_eq!(registry.platforms(), vec![PlatformId::Instagram]);
	assert!(registry.get(PlatformId::Linkedin).is_none());
	assert!(matches!(registry.resolve("LinkedIn"), Err(Error::Config(_))));
	assert!(matches!(registry.resolve("myspace"), Err(Error::UnsupportedPlatform(_))));
}
