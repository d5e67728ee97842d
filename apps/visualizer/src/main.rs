use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    ActivationOutcome, GenerationClient, HomeFlow, HttpGenerationClient, HttpProjectClient,
    InMemoryProjectClient, IntakeController, IntakeEvent, MissingGenerationClient,
    PersistenceClient, RenderPhase, RenderSessionController, SelectedFile, SignInState,
    SubmitOutcome,
};
use shared::domain::Visibility;
use storage::SessionHandoff;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

/// Upload a floor plan and turn it into a 3D visualization.
#[derive(Parser, Debug)]
struct Args {
    /// Floor plan image (jpg, jpeg or png).
    image: PathBuf,
    #[arg(long)]
    generation_url: Option<String>,
    #[arg(long)]
    persistence_url: Option<String>,
    /// Upload as a signed-out user (uploads are refused).
    #[arg(long)]
    signed_out: bool,
    #[arg(long)]
    public: bool,
    /// Write the rendered image here once it is available.
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if args.generation_url.is_some() {
        settings.generation_url = args.generation_url;
    }
    if args.persistence_url.is_some() {
        settings.persistence_url = args.persistence_url;
    }
    if args.signed_out {
        settings.signed_in = false;
    }
    if args.public {
        settings.visibility = Visibility::Public;
    }

    let persistence: Arc<dyn PersistenceClient> = match settings.persistence_url.as_deref() {
        Some(url) => Arc::new(HttpProjectClient::new(url)?),
        None => {
            info!("no project service configured; keeping projects in memory");
            Arc::new(InMemoryProjectClient::new())
        }
    };
    let generator: Arc<dyn GenerationClient> = match settings.generation_url.as_deref() {
        Some(url) => Arc::new(HttpGenerationClient::new(url)?),
        None => {
            warn!("no generation service configured; renders will not be produced");
            Arc::new(MissingGenerationClient)
        }
    };

    let handoff = SessionHandoff::in_memory();
    let home = HomeFlow::new(persistence, handoff.clone(), settings.visibility);

    let (completed_tx, mut completed_rx) = mpsc::unbounded_channel();
    let intake = IntakeController::new(
        Arc::new(SignInState::new(settings.signed_in)),
        settings.intake_timing(),
        Arc::new(move |encoded: String| {
            let _ = completed_tx.send(encoded);
        }),
    );
    let mut events = intake.subscribe();

    match intake.submit(SelectedFile::from_path(&args.image)) {
        SubmitOutcome::Accepted => {}
        SubmitOutcome::Unauthorized => bail!("Sign in to upload a floor plan"),
        SubmitOutcome::UnsupportedType => bail!(
            "'{}' is not a supported floor plan; use jpg, jpeg or png up to 10MB",
            args.image.display()
        ),
    }

    let encoded = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(IntakeEvent::Progress(progress)) => {
                    let status = intake.snapshot().status_text().unwrap_or_default();
                    println!("[{progress:>3}%] {status}");
                }
                Ok(IntakeEvent::Failed { file_name, reason }) => {
                    bail!("failed to read '{file_name}': {reason}");
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => bail!("upload events closed unexpectedly"),
            },
            encoded = completed_rx.recv() => match encoded {
                Some(encoded) => break encoded,
                None => bail!("upload finished without a result"),
            },
        }
    };

    let route = match home.handle_upload_complete(encoded).await {
        Ok(route) => route,
        Err(err) => {
            error!(error = %err, "upload could not be saved");
            return Err(err.into());
        }
    };
    info!(route = %route.path(), "opening visualizer");

    let render = RenderSessionController::new(handoff, generator);
    match render.activate(route.project_id().cloned()) {
        ActivationOutcome::NotFound => bail!(
            "Floor plan not found. This session may have expired or the link is invalid; upload it again."
        ),
        ActivationOutcome::Generating(handle) => {
            println!("Rendering ... generating your 3D visualization");
            handle.await.context("generation task failed")?;
        }
        ActivationOutcome::Cached | ActivationOutcome::AlreadyClaimed => {}
    }

    let session = render.snapshot();
    match session.phase() {
        RenderPhase::Rendered | RenderPhase::Cached => {
            println!("3D view ready for {}", session.name)
        }
        _ => println!("No render produced; showing the original floor plan"),
    }

    if let Some(path) = args.export {
        if session.can_export() {
            let written = render.export_rendered(&path).await?;
            println!("exported {written} bytes to {}", path.display());
        } else {
            warn!(path = %path.display(), "nothing to export");
        }
    }

    Ok(())
}
