//! File intake: read the selected floor plan, run the simulated analysis meter,
//! then hand the encoded image to the completion handler.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::broadcast,
    time::{interval_at, sleep, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    encoding::{encode_data_uri, is_accepted_image, mime_type_for},
    error::IntakeError,
    schedule::ScheduledTask,
    UploadAuthorization, PROGRESS_INCREMENT, REDIRECT_DELAY_MS, UPLOAD_INTERVAL_MS,
};

const EVENT_CAPACITY: usize = 64;

pub type CompletionHandler = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeTiming {
    pub interval: Duration,
    pub increment: u8,
    pub redirect_delay: Duration,
}

impl Default for IntakeTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(UPLOAD_INTERVAL_MS),
            increment: PROGRESS_INCREMENT,
            redirect_delay: Duration::from_millis(REDIRECT_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    source: FileSource,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn read_data_uri(self) -> Result<String, IntakeError> {
        let bytes = match self.source {
            FileSource::Bytes(bytes) => bytes,
            FileSource::Path(path) => tokio::fs::read(&path)
                .await
                .map_err(|source| IntakeError::Read { path, source })?,
        };
        Ok(encode_data_uri(&bytes, &mime_type_for(&self.name)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Reading,
    Simulating,
    Complete,
    /// The file could not be read. Terminal; no completion fires.
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTask {
    pub file_name: Option<String>,
    pub progress: u8,
    pub status: UploadStatus,
}

impl UploadTask {
    pub fn status_text(&self) -> Option<&'static str> {
        match self.status {
            UploadStatus::Idle | UploadStatus::Failed => None,
            _ if self.progress < 100 => Some("Analyzing floor plan ..."),
            _ => Some("Redirecting ..."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    Started { file_name: String },
    Progress(u8),
    Completed { file_name: String },
    Failed { file_name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Unauthorized,
    UnsupportedType,
}

#[derive(Debug, Default)]
struct IntakeShared {
    task: UploadTask,
    generation: u64,
    dragging: bool,
}

pub struct IntakeController {
    auth: Arc<dyn UploadAuthorization>,
    timing: IntakeTiming,
    on_complete: CompletionHandler,
    shared: Arc<Mutex<IntakeShared>>,
    events: broadcast::Sender<IntakeEvent>,
    timer: Mutex<Option<ScheduledTask>>,
}

impl IntakeController {
    pub fn new(
        auth: Arc<dyn UploadAuthorization>,
        timing: IntakeTiming,
        on_complete: CompletionHandler,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            auth,
            timing,
            on_complete,
            shared: Arc::new(Mutex::new(IntakeShared::default())),
            events,
            timer: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntakeEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> UploadTask {
        lock(&self.shared).task.clone()
    }

    pub fn is_dragging(&self) -> bool {
        lock(&self.shared).dragging
    }

    /// Starts a new intake run, replacing any run still in flight.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, file: SelectedFile) -> SubmitOutcome {
        if !self.auth.can_upload() {
            debug!(file = file.name(), "ignoring upload without permission");
            return SubmitOutcome::Unauthorized;
        }
        if !is_accepted_image(file.name()) {
            warn!(file = file.name(), "ignoring upload with unsupported file type");
            return SubmitOutcome::UnsupportedType;
        }

        let mut timer = lock(&self.timer);
        if let Some(mut previous) = timer.take() {
            previous.cancel();
        }

        let file_name = file.name().to_string();
        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.task = UploadTask {
                file_name: Some(file_name.clone()),
                progress: 0,
                status: UploadStatus::Reading,
            };
            shared.generation
        };
        info!(file = %file_name, generation, "accepted floor plan upload");
        let _ = self.events.send(IntakeEvent::Started { file_name });
        let _ = self.events.send(IntakeEvent::Progress(0));

        let run = IntakeRun {
            shared: self.shared.clone(),
            events: self.events.clone(),
            timing: self.timing,
            on_complete: self.on_complete.clone(),
            generation,
        };
        *timer = Some(ScheduledTask::spawn(run.run(file)));
        SubmitOutcome::Accepted
    }

    pub fn drag_over(&self) {
        if !self.auth.can_upload() {
            return;
        }
        lock(&self.shared).dragging = true;
    }

    pub fn drag_leave(&self) {
        lock(&self.shared).dragging = false;
    }

    pub fn drop_file(&self, file: SelectedFile) -> SubmitOutcome {
        lock(&self.shared).dragging = false;
        self.submit(file)
    }

    /// Abandons the current run, if any, and returns to `Idle`.
    pub fn cancel(&self) {
        if let Some(mut previous) = lock(&self.timer).take() {
            previous.cancel();
        }
        let mut shared = lock(&self.shared);
        shared.generation += 1;
        shared.task = UploadTask::default();
    }
}

struct IntakeRun {
    shared: Arc<Mutex<IntakeShared>>,
    events: broadcast::Sender<IntakeEvent>,
    timing: IntakeTiming,
    on_complete: CompletionHandler,
    generation: u64,
}

impl IntakeRun {
    async fn run(self, file: SelectedFile) {
        let file_name = file.name().to_string();
        let encoded = match file.read_data_uri().await {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(file = %file_name, error = %err, "failed to read floor plan");
                if self
                    .update(|task| task.status = UploadStatus::Failed)
                    .is_some()
                {
                    let _ = self.events.send(IntakeEvent::Failed {
                        file_name,
                        reason: err.to_string(),
                    });
                }
                return;
            }
        };

        if self
            .update(|task| task.status = UploadStatus::Simulating)
            .is_none()
        {
            return;
        }

        let step = self.timing.increment.max(1);
        let period = self.timing.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let Some((progress, finished)) = self.update(|task| {
                let next = task.progress.saturating_add(step);
                if next >= 100 {
                    task.progress = 100;
                    task.status = UploadStatus::Complete;
                    (100, true)
                } else {
                    task.progress = next;
                    (next, false)
                }
            }) else {
                return;
            };
            let _ = self.events.send(IntakeEvent::Progress(progress));
            if finished {
                break;
            }
        }
        drop(ticker);

        sleep(self.timing.redirect_delay).await;
        if self.update(|_| ()).is_none() {
            return;
        }

        info!(file = %file_name, "floor plan analysis complete");
        let _ = self.events.send(IntakeEvent::Completed { file_name });
        (self.on_complete)(encoded);
    }

    /// Applies `f` only while this run is still the current one.
    fn update<T>(&self, f: impl FnOnce(&mut UploadTask) -> T) -> Option<T> {
        let mut shared = lock(&self.shared);
        if shared.generation != self.generation {
            debug!(generation = self.generation, "dropping update from superseded upload");
            return None;
        }
        Some(f(&mut shared.task))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
