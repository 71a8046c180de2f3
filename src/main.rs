//! Redirect fallback service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │              REDIRECT FALLBACK               │
//!                    │                                              │
//!  Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────┐   │
//!  ──────────────────┼─▶│  http   │──▶│ fallback │──▶│  proxy   │───┼──▶ Upstream
//!                    │  │ server  │   │middleware│   │ handler  │   │    Application
//!                    │  └─────────┘   └────┬─────┘   └──────────┘   │
//!                    │                     │ on 404                 │
//!                    │                     ▼                        │
//!                    │              ┌─────────────┐                 │
//!                    │              │  RuleTable  │◀── compiled at  │
//!                    │              │  (resolve)  │    startup from │
//!                    │              └─────────────┘    redirects/   │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! # Commands
//! - `serve` compiles the rules (failing fast on errors in strict mode) and
//!   serves traffic
//! - `validate` lints the rules directory and exits non-zero on errors

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use redirect_fallback::config::{load_or_default, ProxyConfig};
use redirect_fallback::http::HttpServer;
use redirect_fallback::lifecycle::{self, signals, Shutdown};
use redirect_fallback::observability::logging;
use redirect_fallback::redirects::{self, Compilation};

#[derive(Parser)]
#[command(name = "redirect-fallback", version)]
#[command(about = "Serve CSV-defined redirects for requests your application 404s", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile redirect rules and serve traffic
    Serve,
    /// Load every redirect file and report problems without serving
    Validate {
        /// Rules directory (overrides the configuration file).
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Skip the trailing-slash loop analysis.
        #[arg(long)]
        no_append_slash: bool,

        /// Print diagnostics as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    logging::init(&config.observability);

    match cli.command {
        Commands::Serve => {
            serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate {
            directory,
            no_append_slash,
            json,
        } => {
            let directory = directory.unwrap_or_else(|| config.redirects.directory.clone());
            let append_slash = config.redirects.append_slash && !no_append_slash;
            validate(&directory, append_slash, json)
        }
    }
}

async fn serve(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("redirect-fallback v{} starting", env!("CARGO_PKG_VERSION"));

    let table = lifecycle::prepare(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::trigger_on_signal(shutdown));

    HttpServer::new(config, table)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn validate(
    directory: &Path,
    append_slash: bool,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let compilation = redirects::validate_directory(directory, append_slash)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&compilation.diagnostics)?);
    } else {
        print_report(directory, &compilation);
    }

    if compilation.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(directory: &Path, compilation: &Compilation) {
    for diagnostic in &compilation.diagnostics {
        println!("{}", diagnostic);
    }
    println!(
        "{}: {} rules, {} errors, {} warnings",
        directory.display(),
        compilation.table.len(),
        compilation.errors().count(),
        compilation.warnings().count()
    );
}
