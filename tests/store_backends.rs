// std
use std::{
	path::PathBuf,
	time::{SystemTime, UNIX_EPOCH},
};
// self
use portfolio_link::{
	auth::PortfolioId,
	platform::PlatformId,
	store::{ConnectionStore, ConnectionUpdate, FileStore, MemoryStore},
};

fn portfolio(value: &str) -> PortfolioId {
	PortfolioId::new(value).expect("Portfolio fixture should be valid.")
}

fn scratch_path(name: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the epoch.")
		.as_nanos();

	std::env::temp_dir().join(format!("portfolio-link-{name}-{nanos}")).join("connections.json")
}

#[tokio::test]
async fn memory_store_upserts_replace_rows() {
	let store = MemoryStore::default();
	let p1 = portfolio("p1");

	store
		.upsert(ConnectionUpdate::connected(
			p1.clone(),
			PlatformId::Instagram,
			420,
			Some(12),
			Some("Studio".into()),
		))
		.await
		.expect("Connected upsert should succeed.");
	store
		.upsert(ConnectionUpdate::disconnected(p1.clone(), PlatformId::Instagram))
		.await
		.expect("Disconnected upsert should succeed.");

	let row = store
		.get(&p1, PlatformId::Instagram)
		.await
		.expect("Lookup should succeed.")
		.expect("Row should exist.");

	assert!(!row.is_connected);
	assert_eq!(row.follower_count, 0);
	assert_eq!(row.media_count, None);
	assert_eq!(row.provider_display_name, None);
	assert_eq!(store.len(), 1);
	assert!(
		store.get(&p1, PlatformId::Linkedin).await.expect("Lookup should succeed.").is_none()
	);
}

#[tokio::test]
async fn file_store_survives_reopen() {
	let path = scratch_path("reopen");
	let p1 = portfolio("p1");

	{
		let store = FileStore::open(&path).expect("File store should open.");

		store
			.upsert(ConnectionUpdate::connected(p1.clone(), PlatformId::Linkedin, 77, None, None))
			.await
			.expect("Upsert should persist.");
	}

	let reopened = FileStore::open(&path).expect("File store should reopen.");
	let row = reopened
		.get(&p1, PlatformId::Linkedin)
		.await
		.expect("Lookup should succeed.")
		.expect("Row should survive a reopen.");

	assert!(row.is_connected);
	assert_eq!(row.follower_count, 77);
	assert_eq!(reopened.path(), path.as_path());

	if let Some(dir) = path.parent() {
		let _ = std::fs::remove_dir_all(dir);
	}
}
