//! Disconnect, connection lookup, and analytics reads.

// self
use crate::{
	_prelude::*,
	analytics::AnalyticsSnapshot,
	auth::PortfolioId,
	flows::{LinkOrchestrator, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	platform::PlatformId,
	store::{ConnectionUpdate, PlatformConnection},
};

impl LinkOrchestrator {
	/// Marks the pair disconnected and clears its metrics.
	///
	/// Unconditional and idempotent: the row is written whether or not it existed. Nothing is
	/// revoked at the provider.
	pub async fn disconnect(&self, portfolio_id: &PortfolioId, platform: PlatformId) -> Result<()> {
		const KIND: FlowKind = FlowKind::Disconnect;

		let span = FlowSpan::new(KIND, "disconnect", platform.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let update = ConnectionUpdate::disconnected(portfolio_id.clone(), platform);
		let result = span.instrument(common::commit(self, update)).await;

		common::report(KIND, Some(platform), &result);

		result
	}

	/// Reads the stored connection row for the pair.
	pub async fn connection(
		&self,
		portfolio_id: &PortfolioId,
		platform: PlatformId,
	) -> Result<Option<PlatformConnection>> {
		Ok(self.store.get(portfolio_id, platform).await?)
	}

	/// Analytics for a connected platform.
	///
	/// Fails with [`Error::NotConnected`] unless the stored row is connected.
	pub async fn fetch_analytics_snapshot(
		&self,
		portfolio_id: &PortfolioId,
		platform: PlatformId,
	) -> Result<AnalyticsSnapshot> {
		const KIND: FlowKind = FlowKind::Analytics;

		let span = FlowSpan::new(KIND, "fetch_analytics_snapshot", platform.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let connection = self
					.connection(portfolio_id, platform)
					.await?
					.filter(|connection| connection.is_connected)
					.ok_or_else(|| Error::NotConnected {
						portfolio_id: portfolio_id.clone(),
						platform_id: platform,
					})?;

				Ok(self.analytics.snapshot(&connection))
			})
			.await;

		common::report(KIND, Some(platform), &result);

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		config::LinkConfig, error::ErrorKind, provider::AdapterRegistry, store::MemoryStore,
	};

	fn orchestrator() -> (LinkOrchestrator, MemoryStore) {
		let store = MemoryStore::default();
		let orchestrator = LinkOrchestrator::new(
			AdapterRegistry::new(),
			Arc::new(store.clone()),
			LinkConfig::default(),
		);

		(orchestrator, store)
	}

	#[tokio::test]
	async fn disconnect_writes_a_cleared_row_even_without_adapters() {
		let (orchestrator, store) = orchestrator();
		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");

		orchestrator
			.disconnect(&portfolio, PlatformId::Linkedin)
			.await
			.expect("Disconnect should succeed.");

		let row = orchestrator
			.connection(&portfolio, PlatformId::Linkedin)
			.await
			.expect("Lookup should succeed.")
			.expect("Disconnect should write a row.");

		assert!(!row.is_connected);
		assert_eq!(row.follower_count, 0);
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn analytics_require_a_connected_row() {
		let (orchestrator, _) = orchestrator();
		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");
		let err = orchestrator
			.fetch_analytics_snapshot(&portfolio, PlatformId::Instagram)
			.await
			.expect_err("Missing rows must be reported as not connected.");

		assert_eq!(err.kind(), ErrorKind::NotConnected);
	}
}
