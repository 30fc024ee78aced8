mod batch;
mod cli;
mod config;
mod error;
mod export;
mod inference;
mod ingest;
mod logging;
mod output;
mod privacy;
mod readers;
mod stats;
mod store;
mod types;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Error;
use privacy::IdentifierHasher;
use store::Store;
use types::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init_logging(&config.logging)?;
    let hasher = config.hasher()?;
    tracing::debug!(
        hash_length = hasher.length(),
        collision_bound = hasher.collision_bound(),
        "Patient hash settings"
    );

    match cli.command {
        Some(Commands::Init) => {
            Store::open(&config.database.path)?;
            eprintln!("Database ready: {}", config.database.path.display());
        }
        Some(Commands::Ingest { input, clinic, out }) => {
            let mut store = Store::open(&config.database.path)?;
            let report = ingest::ingest_file(&mut store, &input, &clinic, &hasher)?;
            output::emit_json(&report, out.as_deref())?;
        }
        Some(Commands::Anonymize { input, out }) => {
            let anonymized = ingest::anonymize_file(&input, &hasher)?;
            write_anonymized(&anonymized.batch, out)?;
        }
        Some(Commands::Stats { bucket_counts, out }) => {
            let store = Store::open(&config.database.path)?;
            let report = stats::AnalyticsReport::from_records(&store.records()?, bucket_counts);
            output::emit_json(&report, out.as_deref())?;
        }
        Some(Commands::Export { dir }) => {
            let store = Store::open(&config.database.path)?;
            let dir = dir.unwrap_or_else(|| config.export.directory.clone());
            match export::export_to_dir(&store, &dir)? {
                Some(path) => eprintln!("Data exported to: {}", path.display()),
                None => eprintln!("No data available for export"),
            }
        }
        Some(Commands::Gui) | None => {
            #[cfg(not(target_arch = "wasm32"))]
            {
                run_gui(config, hasher)?;
            }
            #[cfg(target_arch = "wasm32")]
            {
                let _ = (config, hasher);
                eprintln!("GUI not supported on this platform");
            }
        }
    }

    Ok(())
}

fn write_anonymized(batch: &batch::RecordBatch, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            let file = std::fs::File::create(&path)?;
            export::write_batch_csv(batch, std::io::BufWriter::new(file))?;
            eprintln!("Anonymized data written to: {}", path.display());
        }
        None => export::write_batch_csv(batch, std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_gui(config: Config, hasher: IdentifierHasher) -> Result<()> {
    use crate::cli::GuiApp;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Clinic Lake",
        options,
        Box::new(move |_cc| Box::new(GuiApp::new(config, hasher))),
    )
    .map_err(|e| Error::InvalidInput(format!("GUI error: {}", e)))?;

    Ok(())
}
