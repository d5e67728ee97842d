//! HTTP implementations of the project and generation services.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::ProjectRecord,
    error::{ApiError, ApiException},
    protocol::{CreateProjectRequest, GenerateViewRequest, GenerateViewResponse},
};
use tracing::debug;
use url::Url;

use crate::{GenerationClient, PersistenceClient};

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let mut base =
        Url::parse(base_url).with_context(|| format!("invalid service url '{base_url}'"))?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .with_context(|| format!("invalid endpoint '{path}' for '{base_url}'"))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .context("failed to decode service response");
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(anyhow::Error::new(ApiException::from(api_error))
            .context(format!("service responded with {status}"))),
        Err(_) => Err(anyhow!("service responded with {status}: {body}")),
    }
}

pub struct HttpProjectClient {
    http: Client,
    projects_url: Url,
}

impl HttpProjectClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            projects_url: endpoint(base_url, "projects")?,
        })
    }
}

#[async_trait]
impl PersistenceClient for HttpProjectClient {
    async fn create_project(&self, request: CreateProjectRequest) -> Result<ProjectRecord> {
        debug!(project_id = %request.item.id, url = %self.projects_url, "creating project");
        let response = self
            .http
            .post(self.projects_url.clone())
            .json(&request)
            .send()
            .await?;
        read_json(response).await
    }
}

pub struct HttpGenerationClient {
    http: Client,
    generate_url: Url,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            generate_url: endpoint(base_url, "generate")?,
        })
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate_3d_view(&self, request: GenerateViewRequest) -> Result<GenerateViewResponse> {
        debug!(url = %self.generate_url, "requesting 3D view");
        let response = self
            .http
            .post(self.generate_url.clone())
            .json(&request)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
