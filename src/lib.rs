pub mod assemble;
pub mod clean;
pub mod codepoints;
pub mod download;
pub mod event;
pub mod load_config;
pub mod pipeline;
pub mod store;
pub mod upload;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use assemble::CommandFontGenerator;
use event::TriggerEvent;
use load_config::load_config;
use pipeline::Pipeline;
use store::FsObjectStore;

#[derive(Parser)]
#[clap(
    name = "webfont-bucket",
    version,
    about = "Generate and publish icon webfont bundles from object-store upload events"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle one object-uploaded trigger event
    Run {
        /// Path to the trigger event JSON file
        #[clap(long)]
        event: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { event, config } => {
            let config = load_config(&config)?;

            let raw_event = fs::read_to_string(&event)
                .with_context(|| format!("Failed to read event file {}", event.display()))?;
            let trigger: TriggerEvent =
                serde_json::from_str(&raw_event).context("Failed to parse trigger event JSON")?;

            let store = FsObjectStore::new(config.store_root.clone());
            let generator = CommandFontGenerator::new(config.generator_command.clone());

            // Hold the tempdir guard for the full invocation when no working
            // dir was configured.
            let (work_dir, _guard) = match config.working_dir {
                Some(dir) => {
                    fs::create_dir_all(&dir).with_context(|| {
                        format!("Failed to create working dir {}", dir.display())
                    })?;
                    (dir, None)
                }
                None => {
                    let tmp = tempfile::tempdir().context("Failed to create working dir")?;
                    (tmp.path().to_path_buf(), Some(tmp))
                }
            };

            let pipeline = Pipeline::new(store, generator, work_dir);
            let response = pipeline.handle(&trigger).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}
