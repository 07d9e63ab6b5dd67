pub mod endpoints;
mod error;
mod macros;
pub mod repositories;

pub use crate::error::TextGenError;
use repositories::*;
use secrecy::{ExposeSecret, SecretString};
use tower_api_client::{Client as ApiClient, Request as ApiRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct Client {
    inner: ApiClient,
}

impl Client {
    pub fn new(api_key: &SecretString) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Point the client at any OpenAI-compatible deployment.
    pub fn with_base_url(base_url: &str, api_key: &SecretString) -> Self {
        Self {
            inner: ApiClient::new(base_url).bearer_auth(api_key.expose_secret()),
        }
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, TextGenError>
    where
        R: ApiRequest,
    {
        self.inner.send(request).await.map_err(From::from)
    }
}

pub struct Request;

impl Request {
    pub fn chat() -> ChatRepository {
        ChatRepository::new()
    }
}
