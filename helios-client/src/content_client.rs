//! REST client for the external content store.

use std::time::Duration;

use async_trait::async_trait;
use helios_core::{
    ConfigError, ContentError, ContentFields, ContentItem, ContentKind, ContentStore, HeliosError,
    HeliosResult,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum ContentClientError {
    #[error("HTTP error for {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Request to {endpoint} failed with HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ContentClientError> for HeliosError {
    fn from(err: ContentClientError) -> Self {
        match err {
            ContentClientError::Http { endpoint, source } => match source.status() {
                Some(status) => ContentError::RequestFailed {
                    endpoint,
                    status: status.as_u16(),
                    message: source.to_string(),
                },
                None => ContentError::Transport {
                    endpoint,
                    reason: source.to_string(),
                },
            }
            .into(),
            ContentClientError::Decode { endpoint, source } => ContentError::InvalidResponse {
                endpoint,
                reason: source.to_string(),
            }
            .into(),
            ContentClientError::Status {
                endpoint,
                status,
                message,
            } => ContentError::RequestFailed {
                endpoint,
                status,
                message,
            }
            .into(),
            ContentClientError::Config(reason) => ConfigError::InvalidValue {
                field: "content client".to_string(),
                value: String::new(),
                reason,
            }
            .into(),
        }
    }
}

/// Error payload returned by the content store on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The store answers list requests either with a bare array or wrapped in
/// `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody {
    Items(Vec<ContentItem>),
    Wrapped { data: Vec<ContentItem> },
}

impl ListBody {
    fn into_items(self) -> Vec<ContentItem> {
        match self {
            ListBody::Items(items) | ListBody::Wrapped { data: items } => items,
        }
    }
}

#[derive(Clone)]
pub struct ContentClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl ContentClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ContentClientError> {
        Self::from_parts(
            &config.content_base_url,
            config.request_timeout(),
            config.api_key.as_deref(),
        )
    }

    pub fn from_parts(
        base_url: &str,
        timeout: Duration,
        api_key: Option<&str>,
    ) -> Result<Self, ContentClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContentClientError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: build_headers(api_key)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_items(&self, kind: ContentKind) -> Result<Vec<ContentItem>, ContentClientError> {
        let request = self.client.get(self.url(kind, None));
        let body: ListBody = self.send_json(kind.endpoint(), request).await?;
        Ok(body.into_items())
    }

    pub async fn create_item(
        &self,
        kind: ContentKind,
        fields: &ContentFields,
    ) -> Result<ContentItem, ContentClientError> {
        let request = self.client.post(self.url(kind, None)).json(fields);
        self.send_json(kind.endpoint(), request).await
    }

    pub async fn update_item(
        &self,
        kind: ContentKind,
        id: &str,
        fields: &ContentFields,
    ) -> Result<ContentItem, ContentClientError> {
        let request = self.client.put(self.url(kind, Some(id))).json(fields);
        self.send_json(kind.endpoint(), request).await
    }

    pub async fn delete_item(&self, kind: ContentKind, id: &str) -> Result<(), ContentClientError> {
        let endpoint = kind.endpoint();
        let response = self
            .send(endpoint, self.client.delete(self.url(kind, Some(id))))
            .await?;
        // 200 with a body and 204 without one are both fine.
        check_status(endpoint, response).await.map(|_| ())
    }

    fn url(&self, kind: ContentKind, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, kind.endpoint(), id),
            None => format!("{}/{}", self.base_url, kind.endpoint()),
        }
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ContentClientError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|source| ContentClientError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        debug!(endpoint, status = response.status().as_u16(), "Content store responded");
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ContentClientError> {
        let response = self.send(endpoint, request).await?;
        let text = check_status(endpoint, response).await?;
        serde_json::from_str(&text).map_err(|source| ContentClientError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

/// Return the body of a 2xx response, or the decoded error otherwise.
async fn check_status(endpoint: &str, response: Response) -> Result<String, ContentClientError> {
    let status = response.status();
    let text = response.text().await.map_err(|source| ContentClientError::Http {
        endpoint: endpoint.to_string(),
        source,
    })?;
    if status.is_success() {
        return Ok(text);
    }

    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                text
            }
        });
    Err(ContentClientError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message,
    })
}

fn build_headers(api_key: Option<&str>) -> Result<HeaderMap, ContentClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ContentClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

#[async_trait]
impl ContentStore for ContentClient {
    async fn list(&self, kind: ContentKind) -> HeliosResult<Vec<ContentItem>> {
        Ok(self.list_items(kind).await?)
    }

    async fn create(&self, kind: ContentKind, fields: &ContentFields) -> HeliosResult<ContentItem> {
        Ok(self.create_item(kind, fields).await?)
    }

    async fn update(
        &self,
        kind: ContentKind,
        id: &str,
        fields: &ContentFields,
    ) -> HeliosResult<ContentItem> {
        self.update_item(kind, id, fields)
            .await
            .map_err(|e| not_found_or(e, kind, id))
    }

    async fn delete(&self, kind: ContentKind, id: &str) -> HeliosResult<()> {
        self.delete_item(kind, id)
            .await
            .map_err(|e| not_found_or(e, kind, id))
    }
}

fn not_found_or(err: ContentClientError, kind: ContentKind, id: &str) -> HeliosError {
    match err {
        ContentClientError::Status { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            ContentError::NotFound {
                endpoint: kind.endpoint().to_string(),
                id: id.to_string(),
            }
            .into()
        }
        other => other.into(),
    }
}
