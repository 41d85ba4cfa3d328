//! Instagram Business accounts reached through the Meta Graph API.
//!
//! Identity comes from `/me?fields=id,name`. Metrics walk the Facebook pages the user manages
//! (`/{user}/accounts?fields=instagram_business_account`), pick the first page with a linked
//! Instagram Business account, and read `followers_count` and `media_count` from it.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderUserId, ScopeSet},
	config::ClientCredentials,
	error::{ConfigError, ExchangeStage, TokenExchangeError},
	http::ProviderHttpClient,
	oauth2::AuthorizationCode,
	platform::PlatformId,
	provider::{
		AdapterFuture, MetricsSnapshot, MetricsUnavailable, MetricsUnavailableReason,
		ProviderAdapter, ProviderDescriptor, ProviderDescriptorError, TokenExchange,
		client::ProviderClient,
	},
};

#[derive(Deserialize)]
struct GraphUser {
	id: Option<String>,
	name: Option<String>,
}

#[derive(Deserialize)]
struct GraphPages {
	#[serde(default)]
	data: Vec<GraphPage>,
}

#[derive(Deserialize)]
struct GraphPage {
	instagram_business_account: Option<GraphNode>,
}

#[derive(Deserialize)]
struct GraphNode {
	id: String,
}

#[derive(Deserialize)]
struct BusinessAccountCounts {
	followers_count: Option<u64>,
	media_count: Option<u64>,
}

/// [`ProviderAdapter`] for Instagram Business accounts.
pub struct InstagramAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	client: ProviderClient<C>,
}
impl<C> InstagramAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an adapter from a validated descriptor.
	pub fn new(
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		http: Arc<C>,
	) -> Result<Self, ConfigError> {
		if descriptor.platform != PlatformId::Instagram {
			return Err(ProviderDescriptorError::PlatformMismatch {
				expected: PlatformId::Instagram,
				actual: descriptor.platform,
			}
			.into());
		}

		Ok(Self { client: ProviderClient::new(descriptor, credentials, http) })
	}

	/// Descriptor the adapter was built from.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.client.descriptor
	}

	async fn exchange(
		&self,
		code: &AuthorizationCode,
		redirect_uri: &Url,
	) -> Result<TokenExchange, TokenExchangeError> {
		let platform = self.client.platform();
		let access_token = self.client.exchange_token(code, redirect_uri).await?;
		let user = self
			.client
			.get_json::<GraphUser>(&["me"], &[("fields", "id,name")], &access_token)
			.await
			.map_err(|e| e.into_exchange_error(platform))?;
		let provider_user_id = user
			.id
			.as_deref()
			.map(ProviderUserId::new)
			.transpose()
			.map_err(|e| {
				TokenExchangeError::rejected(
					platform,
					ExchangeStage::Identity,
					None,
					format!("identity response carried an unusable id: {e}"),
				)
			})?
			.ok_or_else(|| {
				TokenExchangeError::rejected(
					platform,
					ExchangeStage::Identity,
					None,
					"identity response is missing `id`",
				)
			})?;

		Ok(TokenExchange {
			access_token,
			provider_user_id,
			provider_display_name: user.name.filter(|name| !name.trim().is_empty()),
		})
	}

	async fn metrics(
		&self,
		access_token: &AccessToken,
		provider_user_id: &ProviderUserId,
	) -> Result<MetricsSnapshot, MetricsUnavailableReason> {
		let pages = self
			.client
			.get_json::<GraphPages>(
				&[provider_user_id.as_ref(), "accounts"],
				&[("fields", "instagram_business_account")],
				access_token,
			)
			.await
			.map_err(|e| e.into_metrics_reason())?;
		let business_account = pages
			.data
			.into_iter()
			.find_map(|page| page.instagram_business_account)
			.ok_or(MetricsUnavailableReason::MissingField("instagram_business_account"))?;
		let counts = self
			.client
			.get_json::<BusinessAccountCounts>(
				&[business_account.id.as_str()],
				&[("fields", "followers_count,media_count")],
				access_token,
			)
			.await
			.map_err(|e| e.into_metrics_reason())?;
		let follower_count =
			counts.followers_count.ok_or(MetricsUnavailableReason::MissingField("followers_count"))?;

		Ok(MetricsSnapshot { follower_count, media_count: counts.media_count })
	}
}
impl<C> Debug for InstagramAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstagramAdapter").field("descriptor", &self.client.descriptor).finish()
	}
}
impl<C> ProviderAdapter for InstagramAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn platform(&self) -> PlatformId {
		PlatformId::Instagram
	}

	fn build_authorization_url(
		&self,
		redirect_uri: &Url,
		requested_scopes: Option<&ScopeSet>,
		state: &str,
	) -> Result<Url, ConfigError> {
		self.client.authorization_url(redirect_uri, requested_scopes, state)
	}

	fn exchange_code<'a>(
		&'a self,
		code: &'a AuthorizationCode,
		redirect_uri: &'a Url,
	) -> AdapterFuture<'a, Result<TokenExchange, TokenExchangeError>> {
		Box::pin(self.exchange(code, redirect_uri))
	}

	fn fetch_metrics<'a>(
		&'a self,
		access_token: &'a AccessToken,
		provider_user_id: &'a ProviderUserId,
	) -> AdapterFuture<'a, Result<MetricsSnapshot, MetricsUnavailable>> {
		Box::pin(async move {
			self.metrics(access_token, provider_user_id)
				.await
				.map_err(|reason| MetricsUnavailable { platform: PlatformId::Instagram, reason })
		})
	}
}
