mod app;
mod components;
mod config;
mod document;
mod error;
mod event;
mod handler;
mod logging;
mod modal;
mod models;
mod remote;
mod tree;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::{AppConfig, EditorConfig, LoggingConfig, ServerConfig};
use crate::document::DocumentService;
use crate::event::{Event, EventHandler};
use crate::models::{ModelPicker, SharedModel};
use crate::remote::credentials::CredentialStore;
use crate::remote::generate::{DisabledGenerator, Generator, HttpGenerator};
use crate::remote::http::HttpGateway;
use crate::tree::selection::SelectionBroadcaster;
use crate::tree::sync::TreeEngine;
use crate::tui::{install_panic_hook, Tui};

/// A terminal client for a remote document workspace.
#[derive(Parser, Debug)]
#[command(name = "docws", version, about)]
struct Cli {
    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workspace API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Session token (overrides $DOCWS_TOKEN and the token file)
    #[arg(long)]
    token: Option<String>,

    /// Log filter, e.g. `debug` or `doc_workspace_tui=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Disable document autosave
    #[arg(long)]
    no_autosave: bool,
}

impl Cli {
    /// Partial config carrying only the values given on the command line.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: self.base_url.clone(),
                ..Default::default()
            },
            editor: EditorConfig {
                autosave_secs: self.no_autosave.then_some(0),
            },
            logging: LoggingConfig {
                level: self.log_level.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let credentials = CredentialStore::resolve(cli.token.clone(), config.token_file().as_deref());
    if !credentials.is_authenticated() {
        tracing::warn!("no session token; the workspace will stay empty");
    }

    let gateway = Arc::new(HttpGateway::new(config.base_url(), config.request_timeout())?);
    let generator: Arc<dyn Generator> = if config.ai_enabled() {
        Arc::new(HttpGenerator::new(
            config.ai_base_url(),
            config.request_timeout(),
        )?)
    } else {
        Arc::new(DisabledGenerator)
    };

    let engine = TreeEngine::new(
        gateway.clone(),
        credentials.clone(),
        SelectionBroadcaster::new(),
    );
    let documents = DocumentService::new(gateway, generator, credentials);

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    events.watch_engine(&engine);

    let models = ModelPicker::new(
        SharedModel::new(),
        config.preferred_model().map(String::from),
    );
    let mut app = App::new(
        engine,
        documents,
        events.sender(),
        models,
        config.autosave_interval(),
        config.use_icons(),
    );
    app.request_resync();
    app.request_models();

    tracing::info!(base_url = config.base_url(), "started");

    loop {
        tui.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick => app.tick(),
            Event::Resize(_, _) => {}
            Event::TreeReplaced(roots) => app.handle_tree_replaced(roots),
            Event::SelectionChanged(selection) => app.handle_selection_changed(selection),
            Event::Report(report) => app.handle_report(report),
            Event::MutationDone(outcome) => app.handle_mutation_done(outcome),
            Event::DocumentLoaded { id, result } => app.handle_document_loaded(id, result),
            Event::DocumentSaved {
                id,
                revision,
                result,
            } => app.handle_document_saved(id, revision, result),
            Event::Generated { id, result } => app.handle_generated(id, result),
            Event::ModelsLoaded(result) => app.handle_models_loaded(result),
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown().await;
    tui.restore()?;
    tracing::info!("exited");
    Ok(())
}
