//! HTTP client for the PostgREST-style row API and object storage.
//!
//! Rows live under `/rest/v1/<table>`, objects under
//! `/storage/v1/object/<bucket>/<path>`. Every request carries the project
//! `apikey` plus a bearer token (the signed-in user's, or the api key itself).

use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{Query, RemoteStore};
use async_trait::async_trait;
use courier_types::Row;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// REST client for the remote store.
#[derive(Clone)]
pub struct RestStoreClient {
    client: Client,
    config: RemoteConfig,
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestStoreClient {
    pub fn new(config: RemoteConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Sets the user session token used as bearer credential.
    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), table)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base(), bucket, path.trim_start_matches('/'))
    }

    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.config.api_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(token)
    }
}

#[async_trait]
impl RemoteStore for RestStoreClient {
    async fn select(&self, table: &str, query: &Query) -> SyncResult<Vec<Row>> {
        let url = self.rest_url(table);
        let mut params = query.to_params();
        if query.columns.is_none() {
            params.insert(0, ("select".to_string(), "*".to_string()));
        }
        debug!(table, "select");

        let resp = self
            .request(Method::GET, &url)
            .await
            .query(&params)
            .send()
            .await?;
        read_rows(check_status(resp).await?).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> SyncResult<Vec<Row>> {
        let url = self.rest_url(table);
        debug!(table, count = rows.len(), "insert");

        let resp = self
            .request(Method::POST, &url)
            .await
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;
        read_rows(check_status(resp).await?).await
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> SyncResult<Vec<Row>> {
        if query.filters.is_empty() {
            return Err(SyncError::UnfilteredMutation { verb: "update", table: table.to_string() });
        }
        let url = self.rest_url(table);
        debug!(table, "update");

        let resp = self
            .request(Method::PATCH, &url)
            .await
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        read_rows(check_status(resp).await?).await
    }

    async fn delete(&self, table: &str, query: &Query) -> SyncResult<()> {
        if query.filters.is_empty() {
            return Err(SyncError::UnfilteredMutation { verb: "delete", table: table.to_string() });
        }
        let url = self.rest_url(table);
        debug!(table, "delete");

        let resp = self
            .request(Method::DELETE, &url)
            .await
            .query(&query.to_params())
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> SyncResult<()> {
        let url = self.object_url(bucket, path);
        debug!(bucket, path, size = bytes.len(), "upload");

        let resp = self
            .request(Method::POST, &url)
            .await
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            bucket,
            path.trim_start_matches('/')
        )
    }
}

/// Passes 2xx responses through; maps anything else to `SyncError::Remote`.
async fn check_status(resp: Response) -> SyncResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Remote {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Error bodies are `{"message": ...}` objects; anything else is kept verbatim.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

async fn read_rows(resp: Response) -> SyncResult<Vec<Row>> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}
