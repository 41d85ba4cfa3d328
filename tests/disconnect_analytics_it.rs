#![cfg(feature = "reqwest")]

// self
use portfolio_link::{
	_preludet::*,
	analytics::AnalyticsSnapshot,
	callback::CallbackParams,
	error::ErrorKind,
	flows::{ConnectIntent, LinkOrchestrator},
	platform::PlatformId,
	provider::MetricsUnavailableReason,
};

async fn connect(orchestrator: &LinkOrchestrator, portfolio_id: &str, platform: PlatformId) -> Result<()> {
	let redirect_uri =
		Url::parse("https://app.example.com/auth/callback").expect("Redirect URI fixture should parse.");
	let request = orchestrator
		.start_connect(ConnectIntent::new(portfolio(portfolio_id), platform.as_str(), redirect_uri))
		.expect("Authorization request should be issued.");

	orchestrator
		.handle_callback(CallbackParams::default().with_state(request.state).with_code("abc123"))
		.await
		.result
		.map(|_| ())
}

#[tokio::test]
async fn disconnect_is_idempotent_and_clears_metrics() {
	let adapter = Arc::new(FakeAdapter::succeeding(PlatformId::Instagram, "u1", 420));
	let (orchestrator, store) = build_fake_orchestrator([adapter], test_config());

	connect(&orchestrator, "p1", PlatformId::Instagram).await.expect("Connect should succeed.");

	for _ in 0..2 {
		orchestrator
			.disconnect(&portfolio("p1"), PlatformId::Instagram)
			.await
			.expect("Disconnect should succeed.");

		let row = orchestrator
			.connection(&portfolio("p1"), PlatformId::Instagram)
			.await
			.expect("Connection lookup should succeed.")
			.expect("Disconnect should keep the row.");

		assert!(!row.is_connected);
		assert_eq!(row.follower_count, 0);
		assert_eq!(row.media_count, None);
	}

	assert_eq!(store.upserts(), 3);
	assert_eq!(store.memory().len(), 1);

	orchestrator
		.disconnect(&portfolio("never-connected"), PlatformId::Linkedin)
		.await
		.expect("Disconnecting an unknown pair should still succeed.");
}

#[tokio::test]
async fn metrics_failures_commit_once_with_zero_followers() {
	let adapter = Arc::new(
		FakeAdapter::succeeding(PlatformId::Instagram, "u1", 420)
			.failing_metrics(MetricsUnavailableReason::Transport("connection reset".into())),
	);
	let (orchestrator, store) = build_fake_orchestrator([adapter.clone()], test_config());

	connect(&orchestrator, "p1", PlatformId::Instagram)
		.await
		.expect("Metrics failures must not fail the connect.");

	let row = orchestrator
		.connection(&portfolio("p1"), PlatformId::Instagram)
		.await
		.expect("Connection lookup should succeed.")
		.expect("Connection row should exist.");

	assert!(row.is_connected);
	assert_eq!(row.follower_count, 0);
	assert_eq!(adapter.metrics_calls(), 1);
	assert_eq!(store.upserts(), 1);
}

#[tokio::test]
async fn slow_metrics_are_abandoned_at_the_metrics_timeout() {
	let adapter = Arc::new(
		FakeAdapter::succeeding(PlatformId::Instagram, "u1", 420)
			.with_metrics_delay(std::time::Duration::from_secs(2)),
	);
	let config = test_config().with_metrics_timeout(Duration::milliseconds(50));
	let (orchestrator, store) = build_fake_orchestrator([adapter.clone()], config);
	let redirect_uri =
		Url::parse("https://app.example.com/auth/callback").expect("Redirect URI fixture should parse.");
	let request = orchestrator
		.start_connect(ConnectIntent::new(portfolio("p1"), "instagram", redirect_uri))
		.expect("Authorization request should be issued.");
	let started = std::time::Instant::now();
	let summary = orchestrator
		.handle_callback(CallbackParams::default().with_state(request.state).with_code("abc123"))
		.await
		.result
		.expect("Slow metrics must not fail the connect.");

	assert!(
		started.elapsed() < std::time::Duration::from_secs(1),
		"The metrics lookup should be cut off, took {:?}.",
		started.elapsed()
	);
	assert_eq!(summary.follower_count, 0);
	assert!(!summary.metrics_available);
	assert_eq!(adapter.metrics_calls(), 1);
	assert_eq!(store.upserts(), 1);

	let row = orchestrator
		.connection(&portfolio("p1"), PlatformId::Instagram)
		.await
		.expect("Connection lookup should succeed.")
		.expect("Connection row should exist.");

	assert!(row.is_connected);
	assert_eq!(row.follower_count, 0);
}

#[tokio::test]
async fn concurrent_connect_and_disconnect_leave_one_complete_row() {
	let adapter = Arc::new(FakeAdapter::succeeding(PlatformId::Linkedin, "li-member", 77));
	let (orchestrator, store) = build_fake_orchestrator([adapter], test_config());
	let p1 = portfolio("p1");
	let (connected, disconnected) = tokio::join!(
		connect(&orchestrator, "p1", PlatformId::Linkedin),
		orchestrator.disconnect(&p1, PlatformId::Linkedin)
	);

	connected.expect("Connect should succeed.");
	disconnected.expect("Disconnect should succeed.");

	let row = orchestrator
		.connection(&p1, PlatformId::Linkedin)
		.await
		.expect("Connection lookup should succeed.")
		.expect("Connection row should exist.");
	let as_connected = row.is_connected && row.follower_count == 77;
	let as_disconnected = !row.is_connected && row.follower_count == 0 && row.media_count.is_none();

	assert!(as_connected || as_disconnected, "Row mixes two writes: {row:?}.");
	assert_eq!(store.upserts(), 2);
	assert_eq!(store.memory().len(), 1);
}

#[tokio::test]
async fn analytics_follow_the_stored_connection() {
	let adapters = [
		Arc::new(FakeAdapter::succeeding(PlatformId::Instagram, "u1", 420)),
		Arc::new(FakeAdapter::succeeding(PlatformId::Linkedin, "li-member", 77)),
	];
	let (orchestrator, _) = build_fake_orchestrator(adapters, test_config());
	let err = orchestrator
		.fetch_analytics_snapshot(&portfolio("p1"), PlatformId::Instagram)
		.await
		.expect_err("Analytics require a connection.");

	assert_eq!(err.kind(), ErrorKind::NotConnected);

	connect(&orchestrator, "p1", PlatformId::Instagram).await.expect("Connect should succeed.");
	connect(&orchestrator, "p1", PlatformId::Linkedin).await.expect("Connect should succeed.");

	let instagram = orchestrator
		.fetch_analytics_snapshot(&portfolio("p1"), PlatformId::Instagram)
		.await
		.expect("Connected platforms should report analytics.");

	assert_eq!(
		instagram,
		AnalyticsSnapshot {
			followers: 420,
			engagement_rate: 4.2,
			posts: 45,
			likes: 1250,
			comments: 89,
			shares: 23,
		}
	);

	let linkedin = orchestrator
		.fetch_analytics_snapshot(&portfolio("p1"), PlatformId::Linkedin)
		.await
		.expect("Connected platforms should report analytics.");

	assert_eq!(linkedin.followers, 77);
	assert_eq!(linkedin.engagement_rate, 3.8);
	assert_eq!(linkedin.shares, 67);

	orchestrator
		.disconnect(&portfolio("p1"), PlatformId::Linkedin)
		.await
		.expect("Disconnect should succeed.");

	let err = orchestrator
		.fetch_analytics_snapshot(&portfolio("p1"), PlatformId::Linkedin)
		.await
		.expect_err("Disconnected platforms must not report analytics.");

	assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[tokio::test]
async fn persistence_failures_carry_a_retryable_commit() {
	let adapter = Arc::new(FakeAdapter::succeeding(PlatformId::Instagram, "u1", 420));
	let (orchestrator, store) = build_fake_orchestrator([adapter], test_config());

	store.set_failing(true);

	let redirect_uri =
		Url::parse("https://app.example.com/auth/callback").expect("Redirect URI fixture should parse.");
	let request = orchestrator
		.start_connect(ConnectIntent::new(portfolio("p1"), "instagram", redirect_uri))
		.expect("Authorization request should be issued.");
	let resolution = orchestrator
		.handle_callback(
			CallbackParams::default().with_state(request.state.clone()).with_code("abc123"),
		)
		.await;
	let err = resolution.result.expect_err("Store failures must surface.");

	assert_eq!(err.kind(), ErrorKind::Persistence);

	let pending = err.pending_commit().cloned().expect("Persistence errors carry the commit.");

	assert!(pending.update().is_connected());
	assert_eq!(pending.update().follower_count(), 420);
	let awaited = orchestrator
		.await_completion(&request.state)
		.await
		.expect_err("The attempt should report the persistence failure.");

	assert_eq!(awaited.kind(), ErrorKind::Persistence);
	assert_eq!(
		awaited.pending_commit(),
		Some(&pending),
		"Waiters should receive the same commit to replay."
	);

	store.set_failing(false);

	orchestrator.retry_commit(pending).await.expect("Retried commit should succeed.");
	orchestrator
		.retry_commit(awaited.pending_commit().cloned().expect("Waiter commit should be present."))
		.await
		.expect("Retrying twice should be harmless.");

	let row = orchestrator
		.connection(&portfolio("p1"), PlatformId::Instagram)
		.await
		.expect("Connection lookup should succeed.")
		.expect("Retried commit should write the row.");

	assert!(row.is_connected);
	assert_eq!(row.follower_count, 420);
	assert_eq!(store.upserts(), 3);
	assert_eq!(store.memory().len(), 1);
}

#[tokio::test]
async fn failed_replies_serialize_for_the_ui() {
	let adapter = Arc::new(
		FakeAdapter::succeeding(PlatformId::Linkedin, "li-member", 1)
			.rejecting_exchange(401, "The token used in the request has been revoked by the user"),
	);
	let (orchestrator, store) = build_fake_orchestrator([adapter], test_config());
	let redirect_uri =
		Url::parse("https://app.example.com/auth/callback").expect("Redirect URI fixture should parse.");
	let request = orchestrator
		.start_connect(ConnectIntent::new(portfolio("p1"), "linkedin", redirect_uri))
		.expect("Authorization request should be issued.");
	let reply = orchestrator
		.handle_callback(CallbackParams::default().with_state(request.state).with_code("abc123"))
		.await
		.into_reply();
	let payload = serde_json::to_value(&reply).expect("Reply should serialize.");

	assert_eq!(payload["success"], false);
	assert_eq!(payload["error"]["kind"], "token_exchange");
	assert_eq!(
		payload["error"]["message"],
		"Failed to connect account: The token used in the request has been revoked by the user"
	);
	assert_eq!(payload["completion"]["action"], "close_window");
	assert!(payload.get("followerCount").is_none());
	assert_eq!(store.upserts(), 0);
}
