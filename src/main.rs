use animal_logger::config::Config;
use animal_logger::console::Console;
use animal_logger::db::SchemaRegistry;
use mimalloc::MiMalloc;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let files = Config::default_files();
    let cfg = Config::load(files.as_slice())?;
    animal_logger::logging::init(&cfg)?;

    info!(
        config_files = ?files,
        host = %cfg.host,
        port = cfg.port,
        database = %cfg.database,
        animal_classes = ?cfg.animal_classes,
        loglevel = %cfg.loglevel,
        logs_path = ?cfg.logs_path,
    );

    let handle = animal_logger::service::spawn(cfg.clone(), SchemaRegistry::default()).await?;

    let console = Console::new(handle.clone(), cfg);
    tokio::select! {
        res = console.run() => {
            if let Err(e) = res {
                error!(error = %e, "console stopped");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received; shutting down");
        }
    }

    handle.shutdown();
    Ok(())
}
