//! Storage contract and built-in store implementations for platform connection records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::PortfolioId, platform::PlatformId};

/// Boxed future returned by [`ConnectionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Read/write contract of the external connection table.
///
/// Only the link orchestrator writes through this trait; every write is a full upsert of the
/// (portfolio, platform) row, stamped with the store's clock.
pub trait ConnectionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces the row for the update's (portfolio, platform) pair.
	fn upsert(&self, update: ConnectionUpdate) -> StoreFuture<'_, ()>;

	/// Fetches the row for the pair, if present.
	fn get<'a>(
		&'a self,
		portfolio_id: &'a PortfolioId,
		platform_id: PlatformId,
	) -> StoreFuture<'a, Option<PlatformConnection>>;
}

/// Error type produced by [`ConnectionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Unique key identifying a stored connection row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
	/// Portfolio component.
	pub portfolio_id: PortfolioId,
	/// Platform component.
	pub platform_id: PlatformId,
}
impl ConnectionKey {
	/// Builds a key for the pair.
	pub fn new(portfolio_id: &PortfolioId, platform_id: PlatformId) -> Self {
		Self { portfolio_id: portfolio_id.clone(), platform_id }
	}
}

/// One platform's link state for one portfolio, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConnection {
	/// Owning portfolio.
	pub portfolio_id: PortfolioId,
	/// Linked platform.
	pub platform_id: PlatformId,
	/// Whether the platform is currently linked.
	pub is_connected: bool,
	/// Best-effort follower count; zero when unknown or disconnected.
	pub follower_count: u64,
	/// Best-effort media count; absent when unknown or disconnected.
	pub media_count: Option<u64>,
	/// Provider account name captured at connect time.
	pub provider_display_name: Option<String>,
	/// When the row was last written.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl PlatformConnection {
	/// Key of the row.
	pub fn key(&self) -> ConnectionKey {
		ConnectionKey::new(&self.portfolio_id, self.platform_id)
	}

	/// Follower count, zero unless connected.
	pub fn followers(&self) -> u64 {
		if self.is_connected { self.follower_count } else { 0 }
	}
}

/// A validated write against the connection table.
///
/// Constructed only through [`ConnectionUpdate::connected`] or
/// [`ConnectionUpdate::disconnected`], so a disconnected row can never carry metrics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionUpdate {
	portfolio_id: PortfolioId,
	platform_id: PlatformId,
	is_connected: bool,
	follower_count: u64,
	media_count: Option<u64>,
	provider_display_name: Option<String>,
}
impl ConnectionUpdate {
	/// Marks the pair connected with best-effort metrics.
	pub fn connected(
		portfolio_id: PortfolioId,
		platform_id: PlatformId,
		follower_count: u64,
		media_count: Option<u64>,
		provider_display_name: Option<String>,
	) -> Self {
		Self {
			portfolio_id,
			platform_id,
			is_connected: true,
			follower_count,
			media_count,
			provider_display_name,
		}
	}

	/// Marks the pair disconnected and clears its metrics.
	pub fn disconnected(portfolio_id: PortfolioId, platform_id: PlatformId) -> Self {
		Self {
			portfolio_id,
			platform_id,
			is_connected: false,
			follower_count: 0,
			media_count: None,
			provider_display_name: None,
		}
	}

	/// Target portfolio.
	pub fn portfolio_id(&self) -> &PortfolioId {
		&self.portfolio_id
	}

	/// Target platform.
	pub fn platform_id(&self) -> PlatformId {
		self.platform_id
	}

	/// Connected flag written by this update.
	pub fn is_connected(&self) -> bool {
		self.is_connected
	}

	/// Follower count written by this update.
	pub fn follower_count(&self) -> u64 {
		self.follower_count
	}

	/// Media count written by this update.
	pub fn media_count(&self) -> Option<u64> {
		self.media_count
	}

	/// Provider account name written by this update.
	pub fn provider_display_name(&self) -> Option<&str> {
		self.provider_display_name.as_deref()
	}

	/// Key of the row this update targets.
	pub fn key(&self) -> ConnectionKey {
		ConnectionKey::new(&self.portfolio_id, self.platform_id)
	}

	/// Materializes the row, stamped at `updated_at`.
	pub fn into_connection(self, updated_at: OffsetDateTime) -> PlatformConnection {
		PlatformConnection {
			portfolio_id: self.portfolio_id,
			platform_id: self.platform_id,
			is_connected: self.is_connected,
			follower_count: self.follower_count,
			media_count: self.media_count,
			provider_display_name: self.provider_display_name,
			updated_at,
		}
	}
}
