//! Helpers shared by the flow implementations (state tokens, commit guards, outcome reporting).

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	flows::{LinkOrchestrator, PendingCommit},
	obs::{self, FlowKind, FlowOutcome},
	platform::PlatformId,
	store::{ConnectionKey, ConnectionUpdate},
};

const STATE_LEN: usize = 32;

/// Random alphanumeric token sent as the OAuth `state` parameter.
pub(crate) fn generate_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}

/// Returns (and creates on demand) the commit guard for a connection key.
pub(crate) fn commit_guard(orchestrator: &LinkOrchestrator, key: &ConnectionKey) -> Arc<AsyncMutex<()>> {
	let mut guards = orchestrator.commit_guards.lock();

	guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Upserts `update` while holding the pair's guard.
///
/// Failures carry the update back to the caller as a [`PendingCommit`].
pub(crate) async fn commit(orchestrator: &LinkOrchestrator, update: ConnectionUpdate) -> Result<()> {
	let key = update.key();
	let guard = commit_guard(orchestrator, &key);
	let serialized = guard.lock().await;
	let result = orchestrator.store.upsert(update.clone()).await.map_err(|source| {
		Error::Persistence { source, pending: Box::new(PendingCommit::new(update)) }
	});

	drop(serialized);
	release_commit_guard(orchestrator, &key, guard);

	result
}

/// Drops the map's guard once no other commit holds or waits on it.
fn release_commit_guard(
	orchestrator: &LinkOrchestrator,
	key: &ConnectionKey,
	guard: Arc<AsyncMutex<()>>,
) {
	let mut guards = orchestrator.commit_guards.lock();

	// One reference in the map, one here.
	if Arc::strong_count(&guard) == 2 {
		guards.remove(key);
	}
}

/// Records the terminal outcome of a flow and logs failures.
pub(crate) fn report<T>(kind: FlowKind, platform: Option<PlatformId>, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(err) => {
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
			obs::log_failure(kind, platform, err);
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::PortfolioId,
		config::LinkConfig,
		provider::AdapterRegistry,
		store::{ConnectionStore, MemoryStore},
	};

	fn orchestrator() -> LinkOrchestrator {
		LinkOrchestrator::new(
			AdapterRegistry::new(),
			Arc::new(MemoryStore::default()),
			LinkConfig::default(),
		)
	}

	#[test]
	fn state_tokens_are_long_and_unique() {
		let first = generate_state();
		let second = generate_state();

		assert_eq!(first.len(), STATE_LEN);
		assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first, second, "Consecutive state tokens should differ.");
	}

	#[tokio::test]
	async fn commit_guards_are_released_after_each_write() {
		let orchestrator = orchestrator();

		for i in 0..50 {
			let portfolio =
				PortfolioId::new(format!("p{i}")).expect("Portfolio fixture should be valid.");

			commit(&orchestrator, ConnectionUpdate::disconnected(portfolio, PlatformId::Linkedin))
				.await
				.expect("Commit should succeed.");
		}

		assert!(orchestrator.commit_guards.lock().is_empty());
	}

	#[tokio::test]
	async fn concurrent_commits_on_one_pair_share_a_guard_and_release_it() {
		let orchestrator = orchestrator();
		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");
		let connected = ConnectionUpdate::connected(
			portfolio.clone(),
			PlatformId::Instagram,
			420,
			Some(37),
			None,
		);
		let disconnected = ConnectionUpdate::disconnected(portfolio.clone(), PlatformId::Instagram);
		let (first, second) = tokio::join!(
			commit(&orchestrator, connected.clone()),
			commit(&orchestrator, disconnected.clone())
		);

		first.expect("First commit should succeed.");
		second.expect("Second commit should succeed.");
		assert!(orchestrator.commit_guards.lock().is_empty());

		let row = orchestrator
			.store
			.get(&portfolio, PlatformId::Instagram)
			.await
			.expect("Lookup should succeed.")
			.expect("Row should exist.");
		let written = [connected, disconnected]
			.into_iter()
			.map(|update| update.into_connection(row.updated_at))
			.any(|candidate| candidate == row);

		assert!(written, "Final row should match one of the two writes: {row:?}.");
	}
}
