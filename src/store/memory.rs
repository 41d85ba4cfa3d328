//! Thread-safe in-memory [`ConnectionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::PortfolioId,
	platform::PlatformId,
	store::{
		ConnectionKey, ConnectionStore, ConnectionUpdate, PlatformConnection, StoreError,
		StoreFuture,
	},
};

type StoreMap = Arc<RwLock<HashMap<ConnectionKey, PlatformConnection>>>;

/// Thread-safe storage backend that keeps rows in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored rows.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when no row has been written.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Copies every stored row.
	pub fn snapshot(&self) -> Vec<PlatformConnection> {
		self.0.read().values().cloned().collect()
	}

	fn upsert_now(map: StoreMap, update: ConnectionUpdate) -> Result<(), StoreError> {
		let key = update.key();

		map.write().insert(key, update.into_connection(OffsetDateTime::now_utc()));

		Ok(())
	}

	fn get_now(map: StoreMap, key: ConnectionKey) -> Option<PlatformConnection> {
		map.read().get(&key).cloned()
	}
}
impl ConnectionStore for MemoryStore {
	fn upsert(&self, update: ConnectionUpdate) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::upsert_now(map, update) })
	}

	fn get<'a>(
		&'a self,
		portfolio_id: &'a PortfolioId,
		platform_id: PlatformId,
	) -> StoreFuture<'a, Option<PlatformConnection>> {
		let map = self.0.clone();
		let key = ConnectionKey::new(portfolio_id, platform_id);

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn upsert_replaces_the_pair_row() {
		let store = MemoryStore::default();
		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");

		store
			.upsert(ConnectionUpdate::connected(
				portfolio.clone(),
				PlatformId::Instagram,
				420,
				Some(12),
				None,
			))
			.await
			.expect("Connected upsert should succeed.");
		store
			.upsert(ConnectionUpdate::disconnected(portfolio.clone(), PlatformId::Instagram))
			.await
			.expect("Disconnected upsert should succeed.");

		let row = store
			.get(&portfolio, PlatformId::Instagram)
			.await
			.expect("Read should succeed.")
			.expect("Row should exist after upserts.");

		assert_eq!(store.len(), 1);
		assert!(!row.is_connected);
		assert_eq!(row.follower_count, 0);
		assert!(
			store
				.get(&portfolio, PlatformId::Linkedin)
				.await
				.expect("Read should succeed.")
				.is_none()
		);
	}
}
