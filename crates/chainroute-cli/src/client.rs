//! Thin JSON client for the node's `/api/v1` endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub struct NodeClient {
    endpoint: String,
    http: reqwest::Client,
    /// Print raw JSON instead of formatted output.
    pub json: bool,
}

impl NodeClient {
    pub fn new(endpoint: &str, json: bool) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            json,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.endpoint, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self.http.get(&url).send().await.map_err(|e| self.unreachable(e))?;
        Self::decode(resp).await
    }

    pub async fn get_query<Q: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> anyhow::Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        Self::decode(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        Self::decode(resp).await
    }

    /// Print `value` as pretty JSON when `--json` was given. Returns whether
    /// it did.
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }

    fn unreachable(&self, err: reqwest::Error) -> anyhow::Error {
        anyhow::anyhow!(
            "could not reach node at {}: {}\nIs the node running? Start it with: chainroute-node",
            self.endpoint,
            err
        )
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        match resp.json::<ErrorResponse>().await {
            Ok(err) => anyhow::bail!("request failed (HTTP {}): {}", status, err.error),
            Err(_) => anyhow::bail!("request failed (HTTP {})", status),
        }
    }
}
