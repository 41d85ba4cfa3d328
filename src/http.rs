//! Transport seam shared by the provider adapters.
//!
//! Adapters never talk to an HTTP stack directly. They build [`HttpRequest`] values with
//! [`form_post`] or [`get`] and hand them to a [`ProviderHttpClient`], which makes the
//! adapters testable against mock servers and lets callers inject their own transport.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
pub use oauth2::{HttpRequest, HttpResponse};
use oauth2::http::{
	Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
// self
use crate::{_prelude::*, auth::AccessToken, error::TransportError};

/// Boxed future returned by [`ProviderHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Executes provider HTTP requests.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every adapter in a registry. Non-2xx responses are returned as responses; only failures
/// that prevent a response from arriving map to [`TransportError`].
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let response = self.0.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Builds an `application/x-www-form-urlencoded` POST carrying `fields`.
pub fn form_post(url: &Url, fields: &[(&str, &str)]) -> Result<HttpRequest, oauth2::http::Error> {
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(fields).finish();

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
		.header(ACCEPT, HeaderValue::from_static("application/json"))
		.body(body.into_bytes())
}

/// Builds a JSON GET, optionally authenticated with a bearer token.
pub fn get(url: &Url, bearer: Option<&AccessToken>) -> Result<HttpRequest, oauth2::http::Error> {
	let mut builder = oauth2::http::Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, HeaderValue::from_static("application/json"));

	if let Some(token) = bearer {
		builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
	}

	builder.body(Vec::new())
}
