use super::{default_config, load_config_or_default, validate_config, write_config};
use std::path::{Path, PathBuf};

#[test]
fn default_config_validates() {
    let config = default_config();
    validate_config(&config).expect("default config is valid");
    assert_eq!(config.port, 8888);
    assert_eq!(config.unit_paths.len(), 2);
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config_or_default(dir.path()).expect("load config");
    assert_eq!(config, default_config());
}

#[test]
fn written_config_is_loaded_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = default_config();
    config.service_command = "true".to_string();
    config.root = dir.path().join("root");
    write_config(dir.path(), &config).expect("write config");

    let loaded = load_config_or_default(dir.path()).expect("load config");
    assert_eq!(loaded, config);
}

#[test]
fn rejects_empty_commands() {
    let mut config = default_config();
    config.reload_command = "   ".to_string();
    let err = validate_config(&config).expect_err("empty command rejected");
    assert!(err.to_string().contains("reload_command"), "{err}");
}

#[test]
fn rejects_relative_rendered_paths() {
    let mut config = default_config();
    config.init_script_path = PathBuf::from("scripts/init.sh");
    assert!(validate_config(&config).is_err());
}

#[test]
fn rejects_schema_mismatch() {
    let mut config = default_config();
    config.schema_version += 1;
    assert!(validate_config(&config).is_err());
}

#[test]
fn rooted_paths_stay_under_root() {
    let mut config = default_config();
    config.root = PathBuf::from("/tmp/agent-root");
    assert_eq!(
        config.rooted(Path::new("/lib/systemd/system/chronograf.service")),
        PathBuf::from("/tmp/agent-root/lib/systemd/system/chronograf.service")
    );
}
