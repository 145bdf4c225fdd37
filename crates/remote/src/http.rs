//! HTTP client for the remote execution substrate.
//!
//! `POST {base}/pipelines` takes the JSON pipeline tree and answers with the
//! matching dispatch record; `GET {base}/results/{handle}` answers with
//! `{ "state": "...", "result": ... }` for one stage.

use async_trait::async_trait;
use serde::Deserialize;
use vox_core::pipeline::{DispatchRecord, Handle, Pipeline, RemoteResult};
use vox_core::substrate::{ExecutionSubstrate, SubstrateError};

/// Body returned by `GET /results/{handle}`.
#[derive(Debug, Deserialize)]
pub struct ResultResponse {
    pub state: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// Substrate reached over HTTP.
pub struct HttpSubstrate {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubstrate {
    /// * `base_url` - e.g. `http://substrate:9000`; a trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// `{base}/results/{handle}` with the handle encoded as one path segment.
    fn results_url(&self, handle: &Handle) -> Result<reqwest::Url, SubstrateError> {
        let invalid =
            || SubstrateError::Transport(format!("invalid substrate URL '{}'", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push("results")
            .push(handle.as_str());
        Ok(url)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SubstrateError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SubstrateError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SubstrateError> {
        let response = Self::ensure_success(response).await?;
        response.json::<T>().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> SubstrateError {
    SubstrateError::Transport(err.to_string())
}

#[async_trait]
impl ExecutionSubstrate for HttpSubstrate {
    async fn submit(&self, pipeline: &Pipeline) -> Result<DispatchRecord, SubstrateError> {
        let response = self
            .client
            .post(format!("{}/pipelines", self.base_url))
            .json(pipeline)
            .send()
            .await
            .map_err(transport)?;

        let record: DispatchRecord = Self::parse_response(response).await?;
        if !record.mirrors(pipeline) {
            tracing::error!(?record, "Substrate returned a record that does not mirror the pipeline");
            return Err(SubstrateError::ShapeMismatch);
        }
        Ok(record)
    }

    async fn poll(&self, handle: &Handle) -> Result<RemoteResult, SubstrateError> {
        let response = self
            .client
            .get(self.results_url(handle)?)
            .send()
            .await
            .map_err(transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SubstrateError::UnknownHandle(handle.clone()));
        }

        let body: ResultResponse = Self::parse_response(response).await?;
        Ok(RemoteResult::from_reported(body.state, body.result))
    }
}
