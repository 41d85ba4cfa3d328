//! Link Instagram Business and LinkedIn Company Page accounts to portfolio records.
//!
//! The crate drives a popup-friendly OAuth authorization-code handshake, correlates the
//! provider redirect back to the portfolio that started it, exchanges the code, fetches
//! best-effort follower metrics, and commits a single connection record per
//! portfolio/platform pair.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod analytics;
pub mod auth;
pub mod callback;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod platform;
pub mod provider;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests: mock-server descriptors,
	//! an insecure reqwest client for self-signed mock certificates, a counting store and a
	//! scripted provider adapter.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	// self
	use crate::{
		auth::{AccessToken, PortfolioId, ProviderUserId, ScopeSet},
		config::{ClientCredentials, LinkConfig},
		error::{ConfigError, TokenExchangeError},
		flows::LinkOrchestrator,
		http::ReqwestHttpClient,
		oauth2::AuthorizationCode,
		platform::PlatformId,
		provider::{
			AdapterFuture, AdapterRegistry, MetricsSnapshot, MetricsUnavailable,
			MetricsUnavailableReason, ProviderAdapter, ProviderDescriptor, TokenExchange,
		},
		store::{ConnectionStore, ConnectionUpdate, MemoryStore, PlatformConnection, StoreError, StoreFuture},
	};

	/// Client identifier configured for Instagram in test orchestrators.
	pub const INSTAGRAM_CLIENT_ID: &str = "ig-app-id";
	/// Client secret configured for Instagram in test orchestrators.
	pub const INSTAGRAM_CLIENT_SECRET: &str = "ig-app-secret";
	/// Client identifier configured for LinkedIn in test orchestrators.
	pub const LINKEDIN_CLIENT_ID: &str = "li-client-id";
	/// Client secret configured for LinkedIn in test orchestrators.
	pub const LINKEDIN_CLIENT_SECRET: &str = "li-client-secret";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose endpoints live under the provided mock server base URL.
	///
	/// Instagram uses `/dialog/oauth`, `/graph/oauth/access_token` and the `/graph` API base;
	/// LinkedIn uses `/oauth/v2/authorization`, `/oauth/v2/accessToken` and the `/v2` API base.
	pub fn mock_descriptor(platform: PlatformId, base: &str) -> ProviderDescriptor {
		let url = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Failed to parse mock provider URL.")
		};
		let builder = ProviderDescriptor::builder(platform);
		let builder = match platform {
			PlatformId::Instagram => builder
				.authorization_endpoint(url("/dialog/oauth"))
				.token_endpoint(url("/graph/oauth/access_token"))
				.api_base(url("/graph"))
				.default_scopes(
					ScopeSet::new(["instagram_basic", "pages_show_list"])
						.expect("Instagram scope fixture should be valid."),
				)
				.scope_delimiter(','),
			PlatformId::Linkedin => builder
				.authorization_endpoint(url("/oauth/v2/authorization"))
				.token_endpoint(url("/oauth/v2/accessToken"))
				.api_base(url("/v2"))
				.default_scopes(
					ScopeSet::new(["r_liteprofile", "rw_organization_admin"])
						.expect("LinkedIn scope fixture should be valid."),
				),
		};

		builder.build().expect("Mock provider descriptor should build successfully.")
	}

	/// Configuration carrying credentials for every supported platform.
	pub fn test_config() -> LinkConfig {
		LinkConfig::default()
			.with_credentials(
				PlatformId::Instagram,
				ClientCredentials::new(INSTAGRAM_CLIENT_ID, INSTAGRAM_CLIENT_SECRET),
			)
			.with_credentials(
				PlatformId::Linkedin,
				ClientCredentials::new(LINKEDIN_CLIENT_ID, LINKEDIN_CLIENT_SECRET),
			)
	}

	/// Constructs a [`LinkOrchestrator`] whose adapters talk to the mock server at `base`
	/// through the insecure reqwest transport, backed by a [`CountingStore`].
	pub fn build_reqwest_test_orchestrator(base: &str) -> (LinkOrchestrator, Arc<CountingStore>) {
		build_reqwest_test_orchestrator_with(base, test_config())
	}

	/// Same as [`build_reqwest_test_orchestrator`] with a caller-supplied configuration.
	pub fn build_reqwest_test_orchestrator_with(
		base: &str,
		config: LinkConfig,
	) -> (LinkOrchestrator, Arc<CountingStore>) {
		let descriptors = PlatformId::ALL.map(|platform| mock_descriptor(platform, base));
		let http = Arc::new(test_reqwest_http_client());
		let registry = AdapterRegistry::from_descriptors(descriptors, &config, http)
			.expect("Mock adapter registry should build successfully.");
		let store = Arc::new(CountingStore::default());
		let orchestrator = LinkOrchestrator::new(registry, store.clone(), config);

		(orchestrator, store)
	}

	/// Constructs a [`LinkOrchestrator`] around scripted adapters (no HTTP at all).
	pub fn build_fake_orchestrator(
		adapters: impl IntoIterator<Item = Arc<FakeAdapter>>,
		config: LinkConfig,
	) -> (LinkOrchestrator, Arc<CountingStore>) {
		let mut registry = AdapterRegistry::new();

		for adapter in adapters {
			registry.register(adapter);
		}

		let store = Arc::new(CountingStore::default());
		let orchestrator = LinkOrchestrator::new(registry, store.clone(), config);

		(orchestrator, store)
	}

	/// Parses a portfolio identifier fixture.
	pub fn portfolio(value: &str) -> PortfolioId {
		PortfolioId::new(value).expect("Portfolio fixture should be valid.")
	}

	/// In-memory store that counts upserts and can be told to fail them.
	#[derive(Debug, Default)]
	pub struct CountingStore {
		inner: MemoryStore,
		upserts: AtomicUsize,
		failing: AtomicBool,
	}
	impl CountingStore {
		/// Number of upserts attempted (successful or not).
		pub fn upserts(&self) -> usize {
			self.upserts.load(Ordering::SeqCst)
		}

		/// Makes every subsequent upsert fail with a backend error until reset.
		pub fn set_failing(&self, failing: bool) {
			self.failing.store(failing, Ordering::SeqCst);
		}

		/// Underlying memory store.
		pub fn memory(&self) -> &MemoryStore {
			&self.inner
		}
	}
	impl ConnectionStore for CountingStore {
		fn upsert(&self, update: ConnectionUpdate) -> StoreFuture<'_, ()> {
			self.upserts.fetch_add(1, Ordering::SeqCst);

			if self.failing.load(Ordering::SeqCst) {
				return Box::pin(async {
					Err(StoreError::Backend { message: "connection table is read-only".into() })
				});
			}

			self.inner.upsert(update)
		}

		fn get<'a>(
			&'a self,
			portfolio_id: &'a PortfolioId,
			platform_id: PlatformId,
		) -> StoreFuture<'a, Option<PlatformConnection>> {
			self.inner.get(portfolio_id, platform_id)
		}
	}

	/// Scripted [`ProviderAdapter`] that records how often each stage runs.
	#[derive(Debug)]
	pub struct FakeAdapter {
		platform: PlatformId,
		client_id: String,
		exchange: Result<TokenExchange, TokenExchangeError>,
		metrics: Result<MetricsSnapshot, MetricsUnavailableReason>,
		exchange_delay: Option<std::time::Duration>,
		metrics_delay: Option<std::time::Duration>,
		exchange_calls: AtomicUsize,
		metrics_calls: AtomicUsize,
	}
	impl FakeAdapter {
		/// Adapter whose exchange yields `access_token`/`user_id` and whose metrics report
		/// `followers`.
		pub fn succeeding(platform: PlatformId, user_id: &str, followers: u64) -> Self {
			Self {
				platform,
				client_id: format!("{platform}-fake-client"),
				exchange: Ok(TokenExchange {
					access_token: AccessToken::new("fake-access-token"),
					provider_user_id: ProviderUserId::new(user_id)
						.expect("Provider user fixture should be valid."),
					provider_display_name: Some("Fake Account".into()),
				}),
				metrics: Ok(MetricsSnapshot { follower_count: followers, media_count: None }),
				exchange_delay: None,
				metrics_delay: None,
				exchange_calls: AtomicUsize::new(0),
				metrics_calls: AtomicUsize::new(0),
			}
		}

		/// Replaces the exchange outcome with a provider rejection.
		pub fn rejecting_exchange(mut self, status: u16, message: &str) -> Self {
			self.exchange = Err(TokenExchangeError::rejected(
				self.platform,
				crate::error::ExchangeStage::Token,
				Some(status),
				message,
			));

			self
		}

		/// Replaces the metrics outcome with an unavailable reason.
		pub fn failing_metrics(mut self, reason: MetricsUnavailableReason) -> Self {
			self.metrics = Err(reason);

			self
		}

		/// Delays the exchange response by `delay`.
		pub fn with_exchange_delay(mut self, delay: std::time::Duration) -> Self {
			self.exchange_delay = Some(delay);

			self
		}

		/// Delays the metrics response by `delay`.
		pub fn with_metrics_delay(mut self, delay: std::time::Duration) -> Self {
			self.metrics_delay = Some(delay);

			self
		}

		/// Number of `exchange_code` invocations.
		pub fn exchange_calls(&self) -> usize {
			self.exchange_calls.load(Ordering::SeqCst)
		}

		/// Number of `fetch_metrics` invocations.
		pub fn metrics_calls(&self) -> usize {
			self.metrics_calls.load(Ordering::SeqCst)
		}
	}
	impl ProviderAdapter for FakeAdapter {
		fn platform(&self) -> PlatformId {
			self.platform
		}

		fn build_authorization_url(
			&self,
			redirect_uri: &Url,
			_requested_scopes: Option<&ScopeSet>,
			state: &str,
		) -> Result<Url, ConfigError> {
			let mut url = Url::parse("https://fake.example.com/authorize")
				.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "authorization", source })?;

			url.query_pairs_mut()
				.append_pair("client_id", &self.client_id)
				.append_pair("redirect_uri", redirect_uri.as_str())
				.append_pair("state", state);

			Ok(url)
		}

		fn exchange_code<'a>(
			&'a self,
			_code: &'a AuthorizationCode,
			_redirect_uri: &'a Url,
		) -> AdapterFuture<'a, Result<TokenExchange, TokenExchangeError>> {
			self.exchange_calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				if let Some(delay) = self.exchange_delay {
					tokio::time::sleep(delay).await;
				}

				self.exchange.clone()
			})
		}

		fn fetch_metrics<'a>(
			&'a self,
			_access_token: &'a AccessToken,
			_provider_user_id: &'a ProviderUserId,
		) -> AdapterFuture<'a, Result<MetricsSnapshot, MetricsUnavailable>> {
			self.metrics_calls.fetch_add(1, Ordering::SeqCst);

			let result = self
				.metrics
				.clone()
				.map_err(|reason| MetricsUnavailable { platform: self.platform, reason });

			let delay = self.metrics_delay;

			Box::pin(async move {
				if let Some(delay) = delay {
					tokio::time::sleep(delay).await;
				}

				result
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
