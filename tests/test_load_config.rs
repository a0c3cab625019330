use std::env;
use std::fs::write;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::NamedTempFile;

use webfont_bucket::load_config::load_config;

/// A complete static config produces a valid AppConfig.
#[tokio::test]
#[serial]
async fn test_load_config_success() {
    let config_yaml = r#"
store:
  root: ./store
generator:
  command: ./bin/fontgen
working_dir: ./work
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();
    env::remove_var("WEBFONT_GENERATOR");

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.store_root, PathBuf::from("./store"));
    assert_eq!(config.working_dir, Some(PathBuf::from("./work")));
    assert_eq!(config.generator_command, PathBuf::from("./bin/fontgen"));
}

/// The WEBFONT_GENERATOR env var takes precedence over the config file.
#[tokio::test]
#[serial]
async fn test_load_config_env_overrides_generator() {
    let config_yaml = r#"
store:
  root: ./store
generator:
  command: ./bin/fontgen
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();
    env::set_var("WEBFONT_GENERATOR", "/usr/local/bin/other-fontgen");

    let config = load_config(config_file.path()).expect("Config should load");
    env::remove_var("WEBFONT_GENERATOR");

    assert_eq!(
        config.generator_command,
        PathBuf::from("/usr/local/bin/other-fontgen")
    );
    assert_eq!(config.working_dir, None);
}

/// No generator in config and no env var makes the loader fail.
#[tokio::test]
#[serial]
async fn test_load_config_errors_without_generator() {
    let config_yaml = r#"
store:
  root: ./store
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();
    env::remove_var("WEBFONT_GENERATOR");

    let result = load_config(config_file.path());
    assert!(result.is_err());
}

/// Invalid YAML fails with a parse error, not a panic.
#[tokio::test]
#[serial]
async fn test_load_config_rejects_invalid_yaml() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "store: [unclosed").unwrap();

    let result = load_config(config_file.path());
    assert!(result.is_err());
}
