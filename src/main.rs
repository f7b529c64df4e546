use clap::Parser;

use mediacenter::media::indexer;
use mediacenter::playback::notify::ChildExitFlag;
use mediacenter::playback::Supervisor;
use mediacenter::server::{self, ServerContext};
use mediacenter::{cli, config};

/// Resolves on the first Ctrl+C. The player runs in its own process group and
/// never sees the terminal's SIGINT, so the server has to stop it itself.
/// A second Ctrl+C while that is in progress force-exits.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nmediacenter: forced exit");
            std::process::exit(1);
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .init();

    let args = cli::Args::parse();

    let file_config = config::find_config_file(args.config.as_deref())
        .and_then(|path| {
            match config::load_config(&path) {
                Ok(cfg) => {
                    tracing::debug!("Loaded config from {}", path.display());
                    Some(cfg)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    None
                }
            }
        });

    let config = config::Config::resolve(file_config, &args);

    for path in &config.roots {
        if !path.exists() {
            eprintln!("error: path does not exist: {}", path.display());
            std::process::exit(1);
        }
        if !path.is_dir() {
            eprintln!("error: not a directory: {}", path.display());
            std::process::exit(1);
        }
    }

    if config.uses_default_admin_key() {
        tracing::warn!("Using the default admin key; set admin_key in the config file");
    }

    // Blocking scan before the listener exists; nothing else can run yet.
    let catalog = indexer::build(&config.roots);
    tracing::info!("Items: {}/{}", catalog.size(), catalog.capacity());

    let exit_flag = ChildExitFlag::new();
    if let Err(e) = exit_flag.listen() {
        eprintln!("error: cannot watch for player exits: {}", e);
        std::process::exit(1);
    }
    let supervisor = Supervisor::new(config.players.clone(), config.stop_grace, exit_flag);

    let addr = config.bind_addr();
    let listener = server::bind(addr).unwrap_or_else(|e| {
        eprintln!("error: failed to bind {}: {}", addr, e);
        std::process::exit(1);
    });

    let mut ctx = ServerContext::new(config, catalog, supervisor);
    if let Err(e) = server::run(&mut ctx, listener, wait_for_ctrl_c()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Goodbye.");
}
