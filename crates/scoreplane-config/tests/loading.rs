use std::path::Path;

use scoreplane_config::{load_config_from_path, ConfigError, ProvisionerBinding};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn load_valid_fixture() {
    let cfg = load_config_from_path(&fixture("config.yaml")).expect("should load without error");
    assert_eq!(cfg.name, "default");
    assert_eq!(cfg.profiles.len(), 2);
    assert_eq!(cfg.defaults.profile, "web-service");
    assert_eq!(cfg.defaults.selectors[0].profile, "worker");

    let postgres = cfg.provisioners.iter().find(|p| p.type_ == "postgres").unwrap();
    assert!(matches!(postgres.strategy, ProvisionerBinding::Strategy(_)));

    let redis = cfg.provisioners.iter().find(|p| p.type_ == "redis").unwrap();
    assert!(matches!(redis.strategy, ProvisionerBinding::ControllerId(ref id) if id == "redis-operator"));
}

#[test]
fn missing_default_profile_is_rejected_as_invalid() {
    let result = load_config_from_path(&fixture("config_missing_default_profile.yaml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn missing_file_returns_not_found() {
    let result = load_config_from_path(Path::new("/nonexistent/path/does/not/exist.yaml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}
