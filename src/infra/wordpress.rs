//! WordPress GraphQL origin over HTTP.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::application::wordpress::{ContentOrigin, OriginError};
use crate::config::WordPressSettings;

use super::error::InfraError;

const METRIC_ORIGIN_REQUEST_MS: &str = "headway_origin_request_ms";

pub struct WordPressClient {
    client: Client,
    endpoint: Url,
    fallback: Url,
}

impl WordPressClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("headway/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::origin(format!("failed to build http client: {err}")))?;
        let fallback = fallback_endpoint(&endpoint);
        Ok(Self {
            client,
            endpoint,
            fallback,
        })
    }

    pub fn from_settings(settings: &WordPressSettings) -> Result<Self, InfraError> {
        Self::new(settings.graphql_url.clone(), settings.timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, url: &Url, payload: &Value) -> Result<reqwest::Response, OriginError> {
        self.client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|err| OriginError::Transport(err.to_string()))
    }
}

#[async_trait]
impl ContentOrigin for WordPressClient {
    async fn fetch(&self, query: &str, variables: Value) -> Result<Value, OriginError> {
        let payload = json!({ "query": query, "variables": variables });
        let started = Instant::now();

        let mut response = self.post(&self.endpoint, &payload).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(fallback = %self.fallback, "GraphQL endpoint not found; trying fallback");
            response = self.post(&self.fallback, &payload).await?;
        }

        let status = response.status();
        histogram!(METRIC_ORIGIN_REQUEST_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        if !status.is_success() {
            return Err(OriginError::Status(status.as_u16()));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| OriginError::Decode(err.to_string()))?;
        body.into_data()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

impl GraphQlResponse {
    fn into_data(self) -> Result<Value, OriginError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|err| err.message).collect();
            warn!(errors = ?messages, "WordPress GraphQL errors");
            return Err(OriginError::GraphQl(messages));
        }
        match self.data {
            Some(data) if data.is_object() => Ok(data),
            _ => Err(OriginError::Decode("response has no data object".to_string())),
        }
    }
}

/// `https://cms.example.com/graphql` → `https://cms.example.com/?graphql`.
fn fallback_endpoint(endpoint: &Url) -> Url {
    let mut fallback = endpoint.clone();
    let base = endpoint
        .path()
        .trim_end_matches('/')
        .trim_end_matches("/graphql")
        .to_string();
    fallback.set_path(&format!("{base}/"));
    fallback.set_query(Some("graphql"));
    fallback
}
