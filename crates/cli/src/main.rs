use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::modules::books::models::Book;
use shelf_kernel::settings::Settings;
use shelf_store::JsonStore;

/// Operator commands for the shelf book catalog
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to apply (local, staging, production)
    #[arg(long = "env", global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Print every HTTP endpoint
    Routes,
    /// Create an empty book store if none exists
    InitStore,
    /// Load the book store and report what it holds
    CheckStore,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        Settings::load_with(self.config_dir.as_deref(), self.environment.as_deref())
            .with_context(|| "failed to load shelf settings")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::debug!(env = ?settings.environment, command = ?cli.command, "shelf cli");

    match cli.command {
        Command::Serve => shelf_app::run(&settings).await,
        Command::Routes => {
            println!("{:<7} /healthz", "GET");
            for endpoint in shelf_app::registry(&settings).endpoints() {
                println!("{}", endpoint);
            }
            Ok(())
        }
        Command::InitStore => {
            let store: JsonStore<Book> = JsonStore::new(settings.store.path.clone());
            if store.ensure_exists().await? {
                println!("created {}", store.path().display());
            } else {
                println!("{} already exists", store.path().display());
            }
            Ok(())
        }
        Command::CheckStore => {
            let store: JsonStore<Book> = JsonStore::new(settings.store.path.clone());
            let books = store
                .load()
                .await
                .with_context(|| format!("cannot read {}", store.path().display()))?;
            let comments: usize = books
                .iter()
                .map(|book| book.comments.as_ref().map_or(0, Vec::len))
                .sum();
            println!(
                "{}: {} books, {} comments",
                store.path().display(),
                books.len(),
                comments
            );
            Ok(())
        }
    }
}
