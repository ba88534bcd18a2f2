//! HTTP implementation of [`CookiePreferencesApi`] against the preference store.

mod tls;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cookie_preferences_sdk::{
    CookiePreferencesApi, CookiePreferencesError, CookieSettings, CookieSettingsUpdate,
};
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue, USER_AGENT};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt as _, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::ConsentClientConfig;
use crate::error::ClientError;

use wire::{ListEnvelope, MessageEnvelope, RecordEnvelope, SaveRequest};

const COLLECTION: &str = "cookie-preferences";
const MESSAGE_PREVIEW_CHARS: usize = 200;

/// Client for the `/cookie-preferences` REST surface.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpPreferencesClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base: Url,
    timeout: Duration,
    user_agent: HeaderValue,
}

impl HttpPreferencesClient {
    /// # Errors
    /// Returns `ClientError::InvalidUrl` if `api_url` is not an absolute
    /// `http`/`https` URL, `ClientError::InvalidUserAgent` for an unusable
    /// user agent, or `ClientError::Transport` if TLS cannot be configured.
    pub fn new(config: &ConsentClientConfig) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: config.api_url.clone(),
            reason,
        };
        let base = Url::parse(&config.api_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http or https origin".to_owned()));
        }
        let user_agent = HeaderValue::from_str(&config.user_agent)?;

        let tls = tls::client_config().map_err(ClientError::transport)?;
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .build(https);

        Ok(Self {
            client,
            base,
            timeout: config.request_timeout,
            user_agent,
        })
    }

    /// Build from [`ConsentClientConfig::from_env`].
    ///
    /// # Errors
    /// Same as [`HttpPreferencesClient::new`].
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(&ConsentClientConfig::from_env())
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, user_id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| ClientError::InvalidUrl {
                url: self.base.to_string(),
                reason: "URL cannot be a base".to_owned(),
            })?;
            segments.pop_if_empty().push(COLLECTION);
            if let Some(id) = user_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), ClientError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(USER_AGENT, self.user_agent.clone())
            .header(ACCEPT, "application/json");
        let body = match body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(bytes))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder.body(body).map_err(ClientError::transport)?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(ClientError::transport)?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(ClientError::transport)?
                .to_bytes();
            Ok::<_, ClientError>((status, bytes))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
    }

    /// Every record in the store.
    ///
    /// # Errors
    /// Returns `ClientError` on transport failure, timeout, a non-2xx status
    /// or an undecodable body.
    #[instrument(skip_all, fields(base = %self.base))]
    pub async fn list(&self) -> Result<Vec<CookieSettings>, ClientError> {
        let url = self.endpoint(None)?;
        let (status, body) = self.send(Method::GET, &url, None).await?;
        let envelope: ListEnvelope = decode(status, &body)?;
        Ok(envelope.data)
    }

    /// POST the full record.
    ///
    /// # Errors
    /// Returns `ClientError::HttpStatus` with the server message when the
    /// store rejects the record, or another `ClientError` on transport failure.
    #[instrument(skip_all, fields(base = %self.base, user_id = %update.user_id))]
    pub async fn save(&self, update: &CookieSettingsUpdate) -> Result<(), ClientError> {
        let url = self.endpoint(None)?;
        let payload = serde_json::to_vec(&SaveRequest::from(update))?;
        let (status, body) = self.send(Method::POST, &url, Some(payload)).await?;
        let _: MessageEnvelope = decode(status, &body)?;
        tracing::debug!("preferences pushed to store");
        Ok(())
    }

    /// Record for `user_id`, `None` on 404.
    ///
    /// # Errors
    /// Returns `ClientError` on transport failure, timeout, any other non-2xx
    /// status or an undecodable body.
    #[instrument(skip_all, fields(base = %self.base, user_id = %user_id))]
    pub async fn fetch(&self, user_id: &str) -> Result<Option<CookieSettings>, ClientError> {
        let url = self.endpoint(Some(user_id))?;
        let (status, body) = self.send(Method::GET, &url, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: RecordEnvelope = decode(status, &body)?;
        Ok(Some(envelope.data))
    }

    /// Delete the record; `Ok(false)` when none existed.
    ///
    /// # Errors
    /// Returns `ClientError` on transport failure, timeout or an unexpected status.
    #[instrument(skip_all, fields(base = %self.base, user_id = %user_id))]
    pub async fn delete(&self, user_id: &str) -> Result<bool, ClientError> {
        let url = self.endpoint(Some(user_id))?;
        let (status, body) = self.send(Method::DELETE, &url, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let envelope: MessageEnvelope = decode(status, &body)?;
        Ok(envelope.success)
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &Bytes) -> Result<T, ClientError> {
    if !status.is_success() {
        return Err(status_error(status, body));
    }
    Ok(serde_json::from_slice(body)?)
}

fn status_error(status: StatusCode, body: &Bytes) -> ClientError {
    let message = match serde_json::from_slice::<MessageEnvelope>(body) {
        Ok(envelope) => envelope.message,
        Err(_) => String::from_utf8_lossy(body)
            .chars()
            .take(MESSAGE_PREVIEW_CHARS)
            .collect(),
    };
    ClientError::HttpStatus { status, message }
}

#[async_trait]
impl CookiePreferencesApi for HttpPreferencesClient {
    async fn list_preferences(&self) -> Result<Vec<CookieSettings>, CookiePreferencesError> {
        Ok(self.list().await?)
    }

    async fn save_preferences(
        &self,
        update: CookieSettingsUpdate,
    ) -> Result<(), CookiePreferencesError> {
        Ok(self.save(&update).await?)
    }

    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<CookieSettings, CookiePreferencesError> {
        self.fetch(user_id)
            .await?
            .ok_or_else(|| CookiePreferencesError::not_found(user_id))
    }

    async fn delete_preferences(&self, user_id: &str) -> Result<bool, CookiePreferencesError> {
        Ok(self.delete(user_id).await?)
    }
}
