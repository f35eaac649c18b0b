use std::path::PathBuf;

use artboard::config::HostConfig;
use artboard::error::HostError;
use artboard::script;
use artboard::session::{Collaborators, Session};
use canvas::coords::ScreenSize;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Surface size used when neither the CLI nor the script gives one.
const DEFAULT_SCREEN: ScreenSize = ScreenSize { width: 1280.0, height: 800.0 };

#[derive(Parser, Debug)]
#[command(name = "artboard", about = "Headless runner for the canvas engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON input script against in-memory stores.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the input script.
    script: PathBuf,

    #[arg(long, env = "ARTBOARD_PROJECT")]
    project: Option<Uuid>,

    /// Surface size as WIDTHxHEIGHT; overrides the script's `screen`.
    #[arg(long, value_parser = script::parse_screen)]
    screen: Option<ScreenSize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HostError> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
    };
    if let Err(e) = &result {
        tracing::error!(code = e.error_code(), error = %e, "artboard failed");
    }
    result
}

async fn run(args: RunArgs) -> Result<(), HostError> {
    let config = HostConfig::from_env()?;
    let script = script::load(&args.script)?;
    let screen = args.screen.or(script.screen).unwrap_or(DEFAULT_SCREEN);
    let project = args.project.unwrap_or_else(Uuid::new_v4);

    let mut session = Session::new(project, &config, Collaborators::in_memory());
    session.load(screen).await?;

    let total = script.events.len();
    for event in script.events {
        session.handle(event).await?;
    }
    session.flush().await?;

    let engine = session.engine();
    let camera = engine.camera();
    info!(
        project = %session.project(),
        events = total,
        items = engine.item_count(),
        zoom = camera.zoom,
        pan_x = camera.x,
        pan_y = camera.y,
        selected = engine.selection().len(),
        primary = ?engine.selection().primary(),
        mode = ?engine.mode(),
        "script finished"
    );
    for item in engine.render_list() {
        info!(id = %item.id, x = item.x, y = item.y, width = item.width, height = item.height, z = item.z_index, "visible item");
    }

    for failure in session.shutdown().await? {
        warn!(op = ?failure.op, item = ?failure.item, error = %failure.error, "unresolved persistence failure");
    }
    Ok(())
}
