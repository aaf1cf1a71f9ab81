use clap::Parser;
use cascade::cli::commands::Cli;
use cascade::cli::handlers;
use cascade::io::config_io;
use tracing_subscriber::EnvFilter;

/// RUST_LOG wins over `--debug`, which wins over the configured level
fn init_tracing(debug: bool, configured: &str) {
    let fallback = if debug {
        "debug"
    } else {
        match configured.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(fallback))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match config_io::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(cli.debug, &config.log.level);

    if let Err(e) = handlers::dispatch(cli, config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
