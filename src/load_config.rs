use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

/// Runtime configuration for a local invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory of the filesystem-backed object store.
    pub store_root: PathBuf,
    /// Working area for staged and generated files; a fresh temporary
    /// directory is used when unset.
    pub working_dir: Option<PathBuf>,
    /// External font-generation program.
    pub generator_command: PathBuf,
}

#[derive(Deserialize)]
struct StaticConfig {
    store: StoreSection,
    #[serde(default)]
    generator: GeneratorSection,
    #[serde(default)]
    working_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct StoreSection {
    root: PathBuf,
}

#[derive(Deserialize, Default)]
struct GeneratorSection {
    #[serde(default)]
    command: Option<PathBuf>,
}

/// Loads the static YAML config. The generator command may come from the
/// config file or be overridden by the `WEBFONT_GENERATOR` env var.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let generator_command = match std::env::var("WEBFONT_GENERATOR") {
        Ok(program) => {
            info!(program = %program, "WEBFONT_GENERATOR overrides configured generator");
            PathBuf::from(program)
        }
        Err(_) => match static_conf.generator.command {
            Some(command) => command,
            None => {
                error!("No generator command in config and WEBFONT_GENERATOR not set");
                anyhow::bail!(
                    "No generator command configured: set generator.command or WEBFONT_GENERATOR"
                );
            }
        },
    };

    info!(
        store_root = %static_conf.store.root.display(),
        generator = %generator_command.display(),
        "Config loaded successfully"
    );

    Ok(AppConfig {
        store_root: static_conf.store.root,
        working_dir: static_conf.working_dir,
        generator_command,
    })
}
