//! # Rx Runtime
//!
//! Wires the intake service to its production adapters.
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration (refuse to start without channel secrets)
//! 2. Initialize logging and metrics
//! 3. Build adapters: local files, PDF renderer, LINE client, optional Drive and printer
//! 4. Seed receipt numbering from today's files
//! 5. Start the idle-session cleanup task
//! 6. Serve the webhook until Ctrl+C

pub mod adapters;
pub mod config;

use crate::adapters::{AdapterError, CommandPrintSpooler, GoogleDriveStorage, LineMessagingClient};
use crate::config::RuntimeConfig;
use axum::Router;
use rx_gateway::{build_router, AppState, Dispatcher};
use rx_intake::{
    InMemorySessionStore, IntakeDependencies, IntakeService, LocalImageStore, MessagingClient,
    PdfDocumentRenderer, PrintTarget, SystemClock, UploadTarget,
};
use std::sync::Arc;
use tracing::info;

/// A fully wired application.
pub struct App {
    pub intake: Arc<IntakeService>,
    pub router: Router,
}

/// Build the intake service and its HTTP router from configuration.
pub fn build_app(config: &RuntimeConfig) -> Result<App, AdapterError> {
    let messaging: Arc<dyn MessagingClient> = Arc::new(LineMessagingClient::new(
        config.channel_access_token.clone(),
        config.http_timeout,
    )?);

    let upload = match config.drive() {
        Some(drive) => {
            info!(folder_id = %drive.folder_id, "[rx-runtime] Drive upload enabled");
            Some(UploadTarget {
                storage: Arc::new(GoogleDriveStorage::new(
                    drive.access_token,
                    config.http_timeout,
                )?),
                parent_folder: drive.folder_id,
            })
        }
        None => {
            info!("[rx-runtime] Drive upload disabled");
            None
        }
    };

    let print = match &config.printer {
        Some(printer) => {
            info!(
                printer = %printer.name,
                command = %printer.command,
                "[rx-runtime] printing enabled"
            );
            Some(PrintTarget {
                spooler: Arc::new(CommandPrintSpooler::new(printer.command.clone())),
                printer: printer.name.clone(),
            })
        }
        None => {
            info!("[rx-runtime] printing disabled");
            None
        }
    };

    let deps = IntakeDependencies {
        sessions: Arc::new(InMemorySessionStore::new()),
        clock: Arc::new(SystemClock),
        messaging: messaging.clone(),
        images: Arc::new(LocalImageStore::new(config.artifact_dir.clone())),
        renderer: Arc::new(PdfDocumentRenderer::default()),
        upload,
        print,
    };
    let intake = Arc::new(IntakeService::new(deps, config.intake_config()));
    if let Some(last) = intake.last_receipt() {
        info!(receipt_id = %last, "[rx-runtime] receipt numbering resumes after existing files");
    }

    let dispatcher = Dispatcher::new(intake.clone(), messaging);
    let router = build_router(AppState::new(dispatcher, config.channel_secret.as_bytes()));

    Ok(App { intake, router })
}
