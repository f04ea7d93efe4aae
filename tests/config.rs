use alertwatch::cli::Cli;
use alertwatch::config::Config;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn config_file(toml_content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    file
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        [core]
        log_level = "debug"
        [subscriptions]
        files = ["/etc/alertwatch/data-quality.yml", "/etc/alertwatch/ownership.yml"]
        [cache]
        max_capacity = 500
        time_to_idle_seconds = 3600
    "#;
    let file = config_file(toml_content);

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(
        config.subscriptions.files,
        vec![
            PathBuf::from("/etc/alertwatch/data-quality.yml"),
            PathBuf::from("/etc/alertwatch/ownership.yml")
        ]
    );
    assert_eq!(config.cache.max_capacity, 500);
    assert_eq!(config.cache.time_to_idle_seconds, Some(3600));
}

#[test]
#[serial]
fn test_load_default_values() {
    let file = config_file("");

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();
    let default_config = Config::default();

    assert_eq!(config, default_config);
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        config: Some(dir.path().join("absent.toml")),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_partial_section_keeps_other_defaults() {
    let file = config_file(
        r#"
        [cache]
        time_to_idle_seconds = 60
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();
    assert_eq!(config.cache.max_capacity, 10_000);
    assert_eq!(config.cache.time_to_idle_seconds, Some(60));
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let file = config_file(
        r#"
        [cache]
        max_capacity = "lots"
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let config = Config::load(&cli);
    assert!(config.is_err());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = config_file(
        r#"
        [cache]
        max_capacity = 500
    "#,
    );
    std::env::set_var("ALERTWATCH_CACHE__MAX_CAPACITY", "42");

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli);
    std::env::remove_var("ALERTWATCH_CACHE__MAX_CAPACITY");

    assert_eq!(config.unwrap().cache.max_capacity, 42);
}

#[test]
#[serial]
fn test_cli_overrides_env_and_file() {
    let file = config_file(
        r#"
        [core]
        log_level = "warn"
        [subscriptions]
        files = ["from-file.yml"]
    "#,
    );
    std::env::set_var("ALERTWATCH_CORE__LOG_LEVEL", "error");

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        log_level: Some("trace".to_string()),
        subscription_files: vec![PathBuf::from("from-cli.yml")],
        ..Default::default()
    };
    let config = Config::load(&cli);
    std::env::remove_var("ALERTWATCH_CORE__LOG_LEVEL");

    let config = config.unwrap();
    assert_eq!(config.core.log_level, "trace");
    assert_eq!(config.subscriptions.files, vec![PathBuf::from("from-cli.yml")]);
}
