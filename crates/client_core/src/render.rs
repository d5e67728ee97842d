//! Render view session: load the handed-off floor plan, then show the cached
//! render or request exactly one generation for the active id.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Context, Result};
use shared::{
    domain::{HandoffRecord, ProjectId},
    protocol::GenerateViewRequest,
};
use storage::SessionHandoff;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{encoding::decode_data_uri, GenerationClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Inactive,
    /// Missing, empty or unreadable session. Recovery is a trip back home.
    Error,
    Loaded,
    Processing,
    Rendered,
    /// The handoff already carried a render; nothing was requested.
    Cached,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSession {
    pub id: Option<ProjectId>,
    pub name: String,
    pub source_image: Option<String>,
    pub rendered_image: Option<String>,
    pub is_processing: bool,
    pub error: bool,
    /// Set once this id has been loaded and claimed for generation.
    pub last_generated_id: Option<ProjectId>,
    from_handoff: bool,
}

impl RenderSession {
    pub fn phase(&self) -> RenderPhase {
        if self.error {
            RenderPhase::Error
        } else if self.is_processing {
            RenderPhase::Processing
        } else if self.rendered_image.is_some() {
            if self.from_handoff {
                RenderPhase::Cached
            } else {
                RenderPhase::Rendered
            }
        } else if self.source_image.is_some() {
            RenderPhase::Loaded
        } else {
            RenderPhase::Inactive
        }
    }

    /// The render when there is one, otherwise the uploaded plan as a placeholder.
    pub fn display_image(&self) -> Option<&str> {
        self.rendered_image
            .as_deref()
            .or(self.source_image.as_deref())
    }

    pub fn can_export(&self) -> bool {
        self.rendered_image.is_some()
    }
}

#[derive(Debug)]
pub enum ActivationOutcome {
    NotFound,
    /// This id is already claimed; nothing changed.
    AlreadyClaimed,
    Cached,
    /// A generation request is in flight. Awaiting the handle is optional.
    Generating(JoinHandle<()>),
}

#[derive(Debug, Default)]
struct RenderState {
    session: RenderSession,
    /// Bumped on every reset so late results from older requests can be recognised.
    request_seq: u64,
}

type SharedState = Arc<Mutex<RenderState>>;

pub struct RenderSessionController {
    handoff: SessionHandoff,
    generator: Arc<dyn GenerationClient>,
    state: SharedState,
    updates: watch::Sender<RenderSession>,
}

impl RenderSessionController {
    pub fn new(handoff: SessionHandoff, generator: Arc<dyn GenerationClient>) -> Self {
        let (updates, _) = watch::channel(RenderSession::default());
        Self {
            handoff,
            generator,
            state: Arc::new(Mutex::new(RenderState::default())),
            updates,
        }
    }

    pub fn snapshot(&self) -> RenderSession {
        lock(&self.state).session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderSession> {
        self.updates.subscribe()
    }

    /// Called whenever the view's target id changes, including the first mount.
    /// Must be called from within a tokio runtime.
    pub fn activate(&self, id: Option<ProjectId>) -> ActivationOutcome {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            warn!("render view activated without a project id");
            self.reset_to_error(None);
            return ActivationOutcome::NotFound;
        };

        let Some(record) = self
            .handoff
            .read(&id)
            .filter(HandoffRecord::has_initial_image)
        else {
            warn!(project_id = %id, "no usable handoff record for project");
            self.reset_to_error(Some(id));
            return ActivationOutcome::NotFound;
        };

        let mut state = lock(&self.state);
        if state.session.last_generated_id.as_ref() == Some(&id) {
            debug!(project_id = %id, "ignoring repeated activation");
            return ActivationOutcome::AlreadyClaimed;
        }

        state.request_seq += 1;
        state.session = RenderSession {
            id: Some(id.clone()),
            name: record.name,
            source_image: Some(record.initial_image.clone()),
            last_generated_id: Some(id.clone()),
            ..RenderSession::default()
        };

        if let Some(rendered) = record
            .initial_rendered_image
            .filter(|image| !image.is_empty())
        {
            state.session.rendered_image = Some(rendered);
            state.session.from_handoff = true;
            self.updates.send_replace(state.session.clone());
            info!(project_id = %id, "using render carried by the session");
            return ActivationOutcome::Cached;
        }

        state.session.is_processing = true;
        let seq = state.request_seq;
        self.updates.send_replace(state.session.clone());
        drop(state);

        info!(project_id = %id, "requesting 3D view generation");
        let run = GenerationRun {
            generator: self.generator.clone(),
            state: self.state.clone(),
            updates: self.updates.clone(),
            id,
            seq,
        };
        ActivationOutcome::Generating(tokio::spawn(run.run(record.initial_image)))
    }

    /// Navigating away. Any in-flight result is discarded when it lands.
    pub fn deactivate(&self) {
        let mut state = lock(&self.state);
        state.request_seq += 1;
        state.session = RenderSession::default();
        self.updates.send_replace(state.session.clone());
    }

    /// Writes the current render's image bytes to `path`.
    pub async fn export_rendered(&self, path: &Path) -> Result<usize> {
        let rendered = self
            .snapshot()
            .rendered_image
            .ok_or_else(|| anyhow!("no rendered image to export"))?;
        let (_, bytes) = decode_data_uri(&rendered)?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("failed to write render to '{}'", path.display()))?;
        Ok(bytes.len())
    }

    fn reset_to_error(&self, id: Option<ProjectId>) {
        let mut state = lock(&self.state);
        state.request_seq += 1;
        state.session = RenderSession {
            id,
            error: true,
            ..RenderSession::default()
        };
        self.updates.send_replace(state.session.clone());
    }
}

struct GenerationRun {
    generator: Arc<dyn GenerationClient>,
    state: SharedState,
    updates: watch::Sender<RenderSession>,
    id: ProjectId,
    seq: u64,
}

impl GenerationRun {
    async fn run(self, source_image: String) {
        let _processing = ProcessingGuard {
            state: self.state.clone(),
            updates: self.updates.clone(),
            seq: self.seq,
        };

        let result = self
            .generator
            .generate_3d_view(GenerateViewRequest { source_image })
            .await;

        let rendered = match result {
            Ok(response) => match response.into_rendered_image() {
                Some(rendered) => rendered,
                None => {
                    warn!(project_id = %self.id, "generation finished without an image");
                    return;
                }
            },
            Err(err) => {
                error!(project_id = %self.id, error = %err, "failed to generate 3D view");
                return;
            }
        };

        let mut state = lock(&self.state);
        if state.request_seq != self.seq || state.session.id.as_ref() != Some(&self.id) {
            debug!(project_id = %self.id, "discarding render for inactive session");
            return;
        }
        state.session.rendered_image = Some(rendered);
        self.updates.send_replace(state.session.clone());
        info!(project_id = %self.id, "3D view ready");
    }
}

/// Clears `is_processing` for its request however the request ends.
struct ProcessingGuard {
    state: SharedState,
    updates: watch::Sender<RenderSession>,
    seq: u64,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.request_seq == self.seq && state.session.is_processing {
            state.session.is_processing = false;
            self.updates.send_replace(state.session.clone());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
