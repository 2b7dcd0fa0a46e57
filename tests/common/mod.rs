#![allow(dead_code)]

use animal_logger::Config;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

/// Unique path under the system temp dir.
pub fn temp_path(prefix: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("{prefix}-{}-{}.{ext}", std::process::id(), nanos));
    path
}

/// Load a config from inline YAML through a temporary file.
pub fn config_from_yaml(yaml: &str) -> Config {
    let path = temp_path("animal-logger-config", "yaml");
    fs::write(&path, yaml).expect("failed to write config");
    let cfg = Config::load(&[&path]).expect("config should load");
    let _ = fs::remove_file(&path);
    cfg
}

/// Config pointing at a port nothing listens on.
pub fn unreachable_config() -> Config {
    config_from_yaml(
        r#"
host: 127.0.0.1
port: 1
database: zoo
connect_timeout_secs: 1
animal_classes: [mammals, birds]
"#,
    )
}
