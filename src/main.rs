use std::sync::Arc;

use tracing::{error, info};

use docportal::{Config, Database, HierarchyEngine, PathResolver, SqliteTreeStore, UserRepository};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = docportal::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        docportal::logging::init_console_only(&config.logging.level);
    }

    info!("docportal - document portal storage service");

    if let Err(e) = run(&config).await {
        error!("Startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> docportal::Result<()> {
    config.validate()?;

    std::fs::create_dir_all(&config.storage.root)?;
    let paths = PathResolver::new(&config.storage.root)?;

    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    let store = SqliteTreeStore::new(db.pool().clone());
    let users = UserRepository::new(db.pool().clone());

    let engine = HierarchyEngine::new(Arc::new(store), Arc::new(users), paths)
        .with_max_file_size(config.storage.max_upload_bytes());

    let roots = engine.store().find_root_folders(None).await?;
    info!(
        "Storage root {} ready ({} root folders, upload limit {} MB)",
        engine.paths().root().display(),
        roots.len(),
        config.storage.max_upload_size_mb
    );
    Ok(())
}
