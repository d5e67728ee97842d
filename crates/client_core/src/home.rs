//! Home-level flow: persist a finished upload, hand it off to the render view,
//! and keep the list of projects created in this session.

use std::sync::{Arc, Mutex, PoisonError};

use shared::{
    domain::{HandoffRecord, ProjectId, ProjectRecord, Visibility},
    protocol::CreateProjectRequest,
};
use storage::SessionHandoff;
use tracing::{debug, error, info};

use crate::{error::HomeError, route::Route, PersistenceClient};

pub struct HomeFlow {
    persistence: Arc<dyn PersistenceClient>,
    handoff: SessionHandoff,
    visibility: Visibility,
    projects: Mutex<Vec<ProjectRecord>>,
}

impl HomeFlow {
    pub fn new(
        persistence: Arc<dyn PersistenceClient>,
        handoff: SessionHandoff,
        visibility: Visibility,
    ) -> Self {
        Self {
            persistence,
            handoff,
            visibility,
            projects: Mutex::new(Vec::new()),
        }
    }

    /// Completion handler for the intake flow. On success the handoff record is
    /// written and the caller should navigate to the returned route; on failure
    /// nothing is written and the caller stays where it is.
    pub async fn handle_upload_complete(&self, encoded_image: String) -> Result<Route, HomeError> {
        let id = ProjectId::generate();
        let draft = ProjectRecord::draft(id.clone(), encoded_image);
        let request = CreateProjectRequest {
            item: draft.clone(),
            visibility: self.visibility,
        };

        let saved = match self.persistence.create_project(request).await {
            Ok(saved) => saved,
            Err(err) => {
                error!(project_id = %id, error = %err, "failed to create project");
                return Err(HomeError::PersistenceFailure(err.to_string()));
            }
        };

        let project = merge_saved(draft, saved);
        self.handoff.write(&id, &HandoffRecord::from_project(&project))?;
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, project);

        info!(project_id = %id, "project created");
        Ok(Route::Visualizer(id))
    }

    /// Re-opens a project from the list, refreshing its handoff record.
    pub fn open_project(&self, id: &ProjectId) -> Result<Route, HomeError> {
        let project = self
            .projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|project| &project.id == id)
            .cloned()
            .ok_or_else(|| HomeError::UnknownProject(id.to_string()))?;

        self.handoff.write(id, &HandoffRecord::from_project(&project))?;
        Ok(Route::Visualizer(id.clone()))
    }

    /// Projects created this session, newest first.
    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Fields confirmed by the service win; blanks fall back to the draft. The
/// locally generated id stays authoritative since it keys the handoff.
fn merge_saved(draft: ProjectRecord, saved: ProjectRecord) -> ProjectRecord {
    if saved.id != draft.id {
        debug!(draft_id = %draft.id, saved_id = %saved.id, "service returned a different id");
    }
    ProjectRecord {
        id: draft.id,
        name: non_empty_or(saved.name, draft.name),
        source_image: non_empty_or(saved.source_image, draft.source_image),
        rendered_image: saved
            .rendered_image
            .filter(|image| !image.is_empty())
            .or(draft.rendered_image),
        timestamp: if saved.timestamp > 0 {
            saved.timestamp
        } else {
            draft.timestamp
        },
    }
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
#[path = "tests/home_tests.rs"]
mod tests;
