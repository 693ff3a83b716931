use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use inkpress::{Config, create_app, featured::FeaturedStore, startup_checks};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage which posts are visible on the blog
    #[command(subcommand)]
    Featured(FeaturedCommands),
}

#[derive(Subcommand, Debug)]
enum FeaturedCommands {
    /// List selected post ids
    List {
        /// Selected posts file (defaults to featured.path from the config)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Make a post visible
    Add {
        post_id: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Hide a post
    Remove {
        post_id: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Featured(cmd)) => handle_featured_command(cmd, &config).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => run_server(config, None, None, None).await,
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        let config = toml_edit::de::from_str::<Config>(&config_content)?;
        info!("Configuration loaded from: {:?}", config_path);
        config
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

async fn handle_featured_command(
    cmd: FeaturedCommands,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let store_for = |file: Option<PathBuf>| {
        FeaturedStore::new(file.unwrap_or_else(|| config.featured.path.clone()))
    };

    match cmd {
        FeaturedCommands::List { file } => {
            let store = store_for(file);
            let ids = store.load().await?;
            if ids.is_empty() {
                println!("No posts selected in {}", store.path().display());
            } else {
                println!("Selected posts in {}:", store.path().display());
                for id in ids {
                    println!("  {}", id);
                }
            }
        }
        FeaturedCommands::Add { post_id, file } => {
            let store = store_for(file);
            let ids = store.set_featured(post_id.trim(), true).await?;
            println!("Post '{}' is visible ({} selected)", post_id.trim(), ids.len());
        }
        FeaturedCommands::Remove { post_id, file } => {
            let store = store_for(file);
            let ids = store.set_featured(post_id.trim(), false).await?;
            println!("Post '{}' is hidden ({} selected)", post_id.trim(), ids.len());
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Template directory: {:?}", config.templates.directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );
    info!("Selected posts file: {:?}", config.featured.path);

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_app(config).await?;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
