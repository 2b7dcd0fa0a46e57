use crate::config::Config;
use crate::error::AppError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file names for a run started at `stamp` (`%Y_%m_%d__%H_%M_%S`).
pub fn log_file_paths(dir: &Path, stamp: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("animal_INFO_{stamp}.txt")),
        dir.join(format!("animal_DEBUG_{stamp}.txt")),
    )
}

/// Install the global subscriber: console output, plus INFO and DEBUG files
/// when a logs directory is configured.
///
/// `RUST_LOG` (or `loglevel`) applies to the console only; the files keep
/// their own fixed levels.
pub fn init(cfg: &Config) -> Result<(), AppError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));

    let console = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_target(false)
        .with_filter(env_filter);

    let files = match cfg.logs_path.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let stamp = chrono::Local::now().format("%Y_%m_%d__%H_%M_%S").to_string();
            let (info_path, debug_path) = log_file_paths(dir, &stamp);
            let info_file = File::create(&info_path)?;
            let debug_file = File::create(&debug_path)?;

            let info_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(info_file))
                .with_filter(LevelFilter::from_level(Level::INFO));
            let debug_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(debug_file))
                .with_filter(LevelFilter::from_level(Level::DEBUG));
            Some(info_layer.and_then(debug_layer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(files)
        .init();
    Ok(())
}
