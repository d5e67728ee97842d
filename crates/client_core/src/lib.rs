use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{ProjectId, ProjectRecord},
    protocol::{CreateProjectRequest, GenerateViewRequest, GenerateViewResponse},
};

pub mod encoding;
pub mod error;
pub mod home;
pub mod intake;
pub mod render;
pub mod route;
pub mod schedule;
pub mod transport;

pub use error::{HomeError, IntakeError};
pub use home::HomeFlow;
pub use intake::{
    IntakeController, IntakeEvent, IntakeTiming, SelectedFile, SubmitOutcome, UploadStatus,
    UploadTask,
};
pub use render::{ActivationOutcome, RenderPhase, RenderSession, RenderSessionController};
pub use route::Route;
pub use transport::{HttpGenerationClient, HttpProjectClient};

pub const UPLOAD_INTERVAL_MS: u64 = 200;
pub const PROGRESS_INCREMENT: u8 = 10;
pub const REDIRECT_DELAY_MS: u64 = 1000;
/// Advertised upload limit. Enforcement belongs to whoever picks the file.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Produces a 3D visualization from a floor plan image.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_3d_view(&self, request: GenerateViewRequest) -> Result<GenerateViewResponse>;
}

/// Creates project records. An `Err` means the project was not saved.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn create_project(&self, request: CreateProjectRequest) -> Result<ProjectRecord>;
}

/// Upload permission, supplied by whatever owns sign-in state.
pub trait UploadAuthorization: Send + Sync {
    fn can_upload(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct SignInState {
    signed_in: AtomicBool,
}

impl SignInState {
    pub fn new(signed_in: bool) -> Self {
        Self {
            signed_in: AtomicBool::new(signed_in),
        }
    }

    pub fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.store(signed_in, Ordering::SeqCst);
    }
}

impl UploadAuthorization for SignInState {
    fn can_upload(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }
}

pub struct MissingGenerationClient;

#[async_trait]
impl GenerationClient for MissingGenerationClient {
    async fn generate_3d_view(
        &self,
        _request: GenerateViewRequest,
    ) -> Result<GenerateViewResponse> {
        Err(anyhow!("generation service is unavailable"))
    }
}

pub struct MissingPersistenceClient;

#[async_trait]
impl PersistenceClient for MissingPersistenceClient {
    async fn create_project(&self, _request: CreateProjectRequest) -> Result<ProjectRecord> {
        Err(anyhow!("project service is unavailable"))
    }
}

/// Keeps confirmed projects in process memory.
#[derive(Debug, Default)]
pub struct InMemoryProjectClient {
    projects: Mutex<HashMap<ProjectId, ProjectRecord>>,
}

impl InMemoryProjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ProjectId) -> Option<ProjectRecord> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl PersistenceClient for InMemoryProjectClient {
    async fn create_project(&self, request: CreateProjectRequest) -> Result<ProjectRecord> {
        let item = request.item;
        if item.source_image.is_empty() {
            return Err(anyhow!("project {} has no source image", item.id));
        }

        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        if projects.contains_key(&item.id) {
            return Err(anyhow!("project {} already exists", item.id));
        }
        projects.insert(item.id.clone(), item.clone());
        Ok(item)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
