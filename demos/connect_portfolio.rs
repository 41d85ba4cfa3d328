//! Issues an authorization URL for a portfolio, simulates the popup being closed, and then
//! disconnects the pair.
//!
//! Credentials come from `META_APP_ID`/`META_APP_SECRET` and
//! `LINKEDIN_CLIENT_ID`/`LINKEDIN_CLIENT_SECRET`; demo values are used when none are set.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use portfolio_link::{
	auth::PortfolioId,
	callback::CompletionMode,
	config::{ClientCredentials, LinkConfig},
	flows::{ConnectIntent, LinkOrchestrator},
	platform::PlatformId,
	provider::AdapterRegistry,
	store::{ConnectionStore, FileStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut config = LinkConfig::from_env()?;

	if config.credentials(PlatformId::Instagram).is_none() {
		config = config.with_credentials(
			PlatformId::Instagram,
			ClientCredentials::new("demo-app-id", "demo-app-secret"),
		);
	}

	let registry = AdapterRegistry::from_config(&config)?;
	let path = std::env::temp_dir().join("portfolio-link-demo").join("connections.json");
	let store: Arc<dyn ConnectionStore> = Arc::new(FileStore::open(&path)?);
	let orchestrator = LinkOrchestrator::new(registry, store, config);
	let portfolio_id = PortfolioId::new("portfolio-42")?;
	let request = orchestrator.start_connect(
		ConnectIntent::new(
			portfolio_id.clone(),
			"instagram",
			Url::parse("https://app.example.com/auth/callback")?,
		)
		.with_launch_mode(CompletionMode::Popup),
	)?;

	println!("Open {} in a popup.", request.auth_url);
	println!("Request `{}` expires at {}.", request.state, request.expires_at);

	// The user closes the popup without authorizing.
	orchestrator.cancel(&request.state);

	match orchestrator.await_completion(&request.state).await {
		Ok(summary) => println!("Connected {} followers.", summary.follower_count),
		Err(e) => println!("Attempt ended: {}", e.user_message()),
	}

	orchestrator.disconnect(&portfolio_id, PlatformId::Instagram).await?;

	if let Some(row) = orchestrator.connection(&portfolio_id, PlatformId::Instagram).await? {
		println!("Stored row in {}: connected = {}.", path.display(), row.is_connected);
	}

	Ok(())
}
