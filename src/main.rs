mod cli;

use streamline::{config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

/// Resolve the effective config: file (or defaults), then env, then CLI.
fn resolve_config(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    base_dir: Option<PathBuf>,
) -> Result<config::Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config::apply_env_overrides(&mut config)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = base_dir {
        config.stream.base_dir = dir;
    }

    Ok(config)
}

async fn start_server(config: config::Config) -> Result<()> {
    for warning in config.validate()? {
        tracing::warn!("Config warning: {warning}");
    }

    tracing::info!("Starting Streamline server");
    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamline=debug,streamline_core=debug,tower_http=debug".to_string()
        } else {
            "streamline=info,streamline_core=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            base_dir,
        } => {
            let config = resolve_config(cli.config.as_deref(), host, port, base_dir)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(config))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streamline {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, using default lookup"),
    }

    let config = resolve_config(path, None, None, None)?;
    let warnings = config.validate()?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Base dir: {}", config.stream.base_dir.display());
    println!("  Route prefix: {}", config.stream.route_prefix);
    println!("  Marker suffix: {}", config.stream.marker_suffix);
    println!("  Poll interval: {}ms", config.stream.poll_interval_ms);
    println!("  Buffer size: {} bytes", config.stream.buffer_size);
    match config.stream.max_idle_secs {
        Some(secs) => println!("  Max idle: {}s", secs),
        None => println!("  Max idle: unlimited"),
    }
    for warning in warnings {
        println!("  warning: {}", warning);
    }

    Ok(())
}
