use super::data::{Config, JudgeSettings};
use super::io::ConfigError;
use super::orchestrator::ConfigOrchestrator;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn load_nonexistent_config_yields_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.judge, JudgeSettings::default());
}

#[test]
fn config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config {
        default_model: Some("mixtral".to_string()),
        voice: Some("Samantha".to_string()),
        ..Default::default()
    };
    config.judge.max_attempts = 3;
    config.set_endpoint("Gemini", "http://localhost:9000/generate".to_string());
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.endpoint_override("gemini"),
        Some("http://localhost:9000/generate")
    );

    let mut loaded = loaded;
    loaded.unset_endpoint("gemini");
    loaded.default_model = None;
    loaded.save_to_path(&config_path).expect("Failed to save");
    let reloaded = Config::load_from_path(&config_path).expect("Failed to load");
    assert!(reloaded.endpoints.is_empty());
    assert_eq!(reloaded.default_model, None);
}

#[test]
fn partial_judge_table_keeps_remaining_defaults() {
    let config: Config = toml::from_str(
        r#"
        markdown = false

        [judge]
        base_url = "http://localhost:2358"
        host = ""
        poll_interval_ms = 250
        "#,
    )
    .expect("valid toml");

    assert!(!config.markdown_enabled());
    assert!(config.syntax_enabled());
    assert_eq!(config.judge.base_url, "http://localhost:2358");
    assert_eq!(config.judge.cpu_time_limit, "8");
    assert_eq!(config.judge.memory_limit, "256000");

    let poll = config.judge.poll_config();
    assert_eq!(poll.interval, Duration::from_millis(250));
    assert_eq!(poll.max_attempts, 10);
}

#[test]
fn invalid_toml_reports_the_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "markdown = \"maybe\"").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn orchestrator_mutations_persist() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let orchestrator = ConfigOrchestrator::new(config_path.clone());

    orchestrator
        .mutate(|config| {
            config.default_model = Some("flux-ai".to_string());
            Ok(())
        })
        .expect("mutate failed");

    let persisted = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(persisted.default_model.as_deref(), Some("flux-ai"));

    let failed: Result<(), _> = orchestrator.mutate(|config| {
        config.default_model = Some("gemini".to_string());
        Err("rejected".into())
    });
    assert!(failed.is_err());
    let cached = orchestrator.load_with_cache().expect("cached load failed");
    assert_eq!(cached.default_model.as_deref(), Some("flux-ai"));
}
