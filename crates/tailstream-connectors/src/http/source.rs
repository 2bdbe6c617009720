//! HTTP client for the log store's query API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tailstream_core::{ConnectorError, QueryResponse, QuerySource};
use tracing::{debug, error};

use super::auth::TokenProvider;

/// Transport configuration for [`HttpQuerySource`].
#[derive(Debug, Clone)]
pub struct QuerySourceConfig {
    /// API base, e.g. `https://api.loganalytics.io`.
    pub base_url: String,
    /// Per-request timeout. A timed-out query is a reported failure, not a
    /// silent retry.
    pub timeout: Duration,
}

impl Default for QuerySourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.loganalytics.io".into(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// [`QuerySource`] over the workspace query endpoint.
///
/// Posts `{"query": ...}` to `{base}/v1/workspaces/{workspace}/query` with
/// a bearer token from the injected [`TokenProvider`]. A non-success status
/// is a typed failure carrying the response body — it is never collapsed
/// into an empty result, which would be indistinguishable from "no new
/// data" and corrupt the resume cursor.
pub struct HttpQuerySource {
    http: reqwest::Client,
    config: QuerySourceConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpQuerySource {
    /// Create a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Connection`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: QuerySourceConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    fn query_url(&self, workspace_id: &str) -> String {
        format!(
            "{}/v1/workspaces/{workspace_id}/query",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl QuerySource for HttpQuerySource {
    async fn execute(
        &self,
        workspace_id: &str,
        query: &str,
    ) -> Result<QueryResponse, ConnectorError> {
        let url = self.query_url(workspace_id);
        let token = self.tokens.bearer_token().await?;
        debug!(%url, "executing query");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectorError::Timeout(self.config.timeout)
                } else {
                    ConnectorError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "query API returned non-success status");
            return Err(ConnectorError::QueryFailed {
                status: status.as_u16(),
                body,
            });
        }

        QueryResponse::parse(&body).map_err(|e| {
            error!(error = %e, body = %body, "failed to decode query response");
            ConnectorError::MalformedResponse(e.to_string())
        })
    }
}
