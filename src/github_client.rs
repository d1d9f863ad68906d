//! Transports for the GitHub APIs

use crate::error::TransportError;
use crate::stats_config::TransportConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const COMMIT_SEARCH_ACCEPT: &str = "application/vnd.github.cloak-preview";

/// Executes a GraphQL document and hands back the raw JSON body
#[async_trait]
pub trait GraphQlClient: Send + Sync {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, TransportError>;
}

/// Runs a commit search (`q` parameter) and hands back the raw JSON body
#[async_trait]
pub trait CommitSearchClient: Send + Sync {
    async fn search_commits(&self, query: &str) -> Result<Value, TransportError>;
}

/// `reqwest` client for the GitHub GraphQL and REST APIs
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("ProfileStats/1.0")
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a response into JSON, mapping non-success statuses to errors
    async fn read_json(response: Response) -> Result<Value, TransportError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GraphQlClient for GitHubClient {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, TransportError> {
        let url = format!("{}/graphql", self.api_url);
        debug!("POST {}", url);

        let request = self
            .client
            .post(&url)
            .json(&json!({ "query": document, "variables": variables }));

        let response = self.authorize(request).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl CommitSearchClient for GitHubClient {
    async fn search_commits(&self, query: &str) -> Result<Value, TransportError> {
        let url = format!("{}/search/commits", self.api_url);
        debug!("GET {} q={}", url, query);

        let request = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .header(ACCEPT, COMMIT_SEARCH_ACCEPT);

        let response = self.authorize(request).send().await?;
        Self::read_json(response).await
    }
}
