use anyhow::{Context, Result};
use ghostmap_core::GhostActivity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::net::protocol::{FetchKind, FetchPayload, Mutation};

/// API failure. Clone so it can travel back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server answered {status} for {path}")]
    Status { status: u16, path: String },
    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid api base url {base:?}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ghostmap-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Transport(format!("bad path {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        decode(path, resp).await
    }

    async fn send_json<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<(), FetchError> {
        let url = self.url(path)?;
        debug!(%url, %method, "mutate");
        let resp = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        check_status(path, &resp)?;
        Ok(())
    }

    pub async fn fetch(&self, kind: &FetchKind) -> Result<FetchPayload, FetchError> {
        let path = kind.path();
        Ok(match kind {
            FetchKind::Projects => FetchPayload::Projects(self.get_json(&path).await?),
            FetchKind::VisualMap(_) => FetchPayload::VisualMap(self.get_json(&path).await?),
            FetchKind::Tree => FetchPayload::Tree(self.get_json(&path).await?),
            FetchKind::Sessions(_) => FetchPayload::Sessions(self.get_json(&path).await?),
            FetchKind::Timeline(_) => FetchPayload::Timeline(self.get_json(&path).await?),
        })
    }

    pub async fn mutate(&self, mutation: &Mutation) -> Result<(), FetchError> {
        use reqwest::Method;
        match mutation {
            Mutation::AddStatus { endpoint, body } => {
                self.send_json(Method::POST, &format!("/api/endpoints/{endpoint}/status"), body)
                    .await
            }
            Mutation::UpdateStatus { status, body } => {
                self.send_json(Method::PUT, &format!("/api/status/{status}"), body)
                    .await
            }
            Mutation::AddRecommendation { target, body } => {
                self.send_json(
                    Method::POST,
                    &format!("/api/targets/{target}/recommendations"),
                    body,
                )
                .await
            }
            Mutation::CreateProject(body) => {
                self.send_json(Method::POST, "/api/projects", body).await
            }
        }
    }

    pub async fn ghost_activity(&self) -> Result<GhostActivity, FetchError> {
        self.get_json("/api/ghost-activity").await
    }
}

fn check_status(path: &str, resp: &reqwest::Response) -> Result<(), FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T, FetchError> {
    check_status(path, &resp)?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::EntityId;

    #[test]
    fn paths_join_onto_base() {
        let api = ApiClient::new("http://127.0.0.1:5000/", Duration::from_secs(5)).unwrap();
        let kind = FetchKind::Timeline(EntityId::from("9"));
        assert_eq!(
            api.url(&kind.path()).unwrap().as_str(),
            "http://127.0.0.1:5000/api/sessions/9/timeline"
        );
    }

    #[test]
    fn bad_base_is_rejected() {
        assert!(ApiClient::new("not a base", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Transport("refused".into()).is_cancelled());
        assert_eq!(
            FetchError::Status { status: 404, path: "/api/projects".into() }.to_string(),
            "server answered 404 for /api/projects"
        );
    }
}
