//! LinkedIn Company Pages reached through LinkedIn API v2.
//!
//! Identity comes from `/me` with bearer auth. Followers come from
//! `/networkSizes/{id}?edgeType=CompanyFollowedByMember`; LinkedIn exposes no media count.

// std
use std::collections::BTreeMap;
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
#[serde(rename_all = "camelCase")]
struct LinkedinProfile {
	id: Option<String>,
	localized_first_name: Option<String>,
	localized_last_name: Option<String>,
	first_name: Option<LocalizedName>,
	last_name: Option<LocalizedName>,
}
impl LinkedinProfile {
	fn display_name(&self) -> Option<String> {
		let first = self
			.localized_first_name
			.clone()
			.or_else(|| self.first_name.as_ref().and_then(LocalizedName::preferred));
		let last = self
			.localized_last_name
			.clone()
			.or_else(|| self.last_name.as_ref().and_then(LocalizedName::preferred));
		let joined = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
		let trimmed = joined.trim();

		(!trimmed.is_empty()).then(|| trimmed.to_owned())
	}
}

#[derive(Deserialize)]
struct LocalizedName {
	#[serde(default)]
	localized: BTreeMap<String, String>,
}
impl LocalizedName {
	fn preferred(&self) -> Option<String> {
		self.localized.get("en_US").or_else(|| self.localized.values().next()).cloned()
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkSize {
	first_degree_size: Option<u64>,
}

/// [`ProviderAdapter`] for LinkedIn Company Pages.
pub struct LinkedinAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	client: ProviderClient<C>,
}
impl<C> LinkedinAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an adapter from a validated descriptor.
	pub fn new(
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		http: Arc<C>,
	) -> Result<Self, ConfigError> {
		if descriptor.platform != PlatformId::Linkedin {
			return Err(ProviderDescriptorError::PlatformMismatch {
				expected: PlatformId::Linkedin,
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
		let profile = self
			.client
			.get_json::<LinkedinProfile>(&["me"], &[], &access_token)
			.await
			.map_err(|e| e.into_exchange_error(platform))?;
		let Some(raw_id) = profile.id.as_deref() else {
			return Err(TokenExchangeError::rejected(
				platform,
				ExchangeStage::Identity,
				None,
				"profile response is missing `id`",
			));
		};
		let provider_user_id = ProviderUserId::new(raw_id).map_err(|e| {
			TokenExchangeError::rejected(
				platform,
				ExchangeStage::Identity,
				None,
				format!("profile response carried an unusable id: {e}"),
			)
		})?;

		Ok(TokenExchange {
			access_token,
			provider_user_id,
			provider_display_name: profile.display_name(),
		})
	}

	async fn metrics(
		&self,
		access_token: &AccessToken,
		provider_user_id: &ProviderUserId,
	) -> Result<MetricsSnapshot, MetricsUnavailableReason> {
		let size = self
			.client
			.get_json::<NetworkSize>(
				&["networkSizes", provider_user_id.as_ref()],
				&[("edgeType", "CompanyFollowedByMember")],
				access_token,
			)
			.await
			.map_err(|e| e.into_metrics_reason())?;
		let follower_count =
			size.first_degree_size.ok_or(MetricsUnavailableReason::MissingField("firstDegreeSize"))?;

		Ok(MetricsSnapshot { follower_count, media_count: None })
	}
}
impl<C> Debug for LinkedinAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkedinAdapter").field("descriptor", &self.client.descriptor).finish()
	}
}
impl<C> ProviderAdapter for LinkedinAdapter<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn platform(&self) -> PlatformId {
		PlatformId::Linkedin
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
				.map_err(|reason| MetricsUnavailable { platform: PlatformId::Linkedin, reason })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn profile(json: &str) -> LinkedinProfile {
		serde_json::from_str(json).expect("Profile fixture should deserialize.")
	}

	#[test]
	fn display_name_prefers_localized_fields() {
		assert_eq!(
			profile(r#"{"id":"li-1","localizedFirstName":"Ada","localizedLastName":"Lovelace"}"#)
				.display_name()
				.as_deref(),
			Some("Ada Lovelace")
		);
		assert_eq!(
			profile(r#"{"id":"li-1","firstName":{"localized":{"en_US":"Grace"}}}"#)
				.display_name()
				.as_deref(),
			Some("Grace")
		);
		assert_eq!(profile(r#"{"id":"li-1"}"#).display_name(), None);
	}
}
