// crates/shorewatch-cli/src/main.rs
// ============================================================================
// Module: Shorewatch CLI Entry Point
// Description: Serve command wiring configuration into the MCP server.
// Purpose: Run the analytic server on stdio or TCP with strict exit codes.
// Dependencies: clap, shorewatch-config, shorewatch-mcp, tokio, toml
// ============================================================================

//! ## Overview
//! The CLI owns everything the analytic core treats as a collaborator:
//! configuration file parsing, secret resolution, output directory
//! bootstrap, service wiring, and transport selection. Exit codes are part
//! of the contract: 0 for clean shutdown, 1 for configuration errors, 2
//! for an unrecoverable backend failure at startup, 3 for
//! signal-initiated termination.
//! Security posture: configuration files and all transport bytes are
//! untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod wiring;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use shorewatch_config::EnvSecrets;
use shorewatch_config::ServerTransport;
use shorewatch_config::ShorewatchConfig;
use shorewatch_mcp::McpServer;

use crate::wiring::build_server;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Clean shutdown.
const EXIT_OK: u8 = 0;
/// Configuration error.
const EXIT_CONFIG: u8 = 1;
/// Unrecoverable backend error at startup.
const EXIT_BACKEND: u8 = 2;
/// Signal-initiated termination.
const EXIT_SIGNAL: u8 = 3;

/// Interval between dependency health refreshes.
const HEALTH_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Command Line
// ============================================================================

/// Shorewatch security-analytics MCP server.
#[derive(Debug, Parser)]
#[command(name = "shorewatch", version, about)]
struct ShorewatchCli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the MCP server.
    Serve {
        /// Path to the TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Serve on TCP instead of stdio.
        #[arg(long)]
        tcp: bool,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ShorewatchCli::parse();
    match cli.command {
        Command::Serve {
            config,
            tcp,
        } => serve(config, tcp).await,
    }
}

/// Runs the serve command.
async fn serve(config_path: Option<PathBuf>, tcp: bool) -> ExitCode {
    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            report(&message);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if tcp {
        config.server.transport = ServerTransport::Tcp;
    }
    if let Err(error) = config.resolve_secrets(&EnvSecrets) {
        report(&error.to_string());
        return ExitCode::from(EXIT_CONFIG);
    }
    if let Err(error) = config.validate() {
        report(&error.to_string());
        return ExitCode::from(EXIT_CONFIG);
    }

    let built = match build_server(&config) {
        Ok(built) => built,
        Err(error) => {
            report(&error.to_string());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // The backing store must be reachable before serving; a cold start
    // against a dead cluster is an operator problem, not a request-time
    // problem.
    built.router.context().refresh_features(&built.features).await;
    if !built.features.snapshot().elasticsearch {
        report("backing store unreachable at startup");
        return ExitCode::from(EXIT_BACKEND);
    }

    let refresh_router = Arc::clone(&built.router);
    let refresh_features = Arc::clone(&built.features);
    let refresher = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            refresh_router.context().refresh_features(&refresh_features).await;
        }
    });

    let outcome = tokio::select! {
        outcome = run_transport(built.server.as_ref(), &config) => outcome,
        signal = wait_for_signal() => {
            report(&format!("terminating on {signal}"));
            refresher.abort();
            return ExitCode::from(EXIT_SIGNAL);
        }
    };
    refresher.abort();
    match outcome {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(message) => {
            report(&message);
            ExitCode::from(EXIT_BACKEND)
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Serves on the configured transport until end of stream.
async fn run_transport(server: &McpServer, config: &ShorewatchConfig) -> Result<(), String> {
    match config.server.transport {
        ServerTransport::Stdio => server
            .serve(tokio::io::stdin(), tokio::io::stdout())
            .await
            .map_err(|error| error.to_string()),
        ServerTransport::Tcp => {
            let port = config.server.tcp_port.ok_or_else(|| "tcp_port missing".to_string())?;
            let address = format!("{}:{port}", config.server.tcp_bind);
            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .map_err(|error| format!("bind {address} failed: {error}"))?;
            loop {
                let (socket, _) =
                    listener.accept().await.map_err(|error| format!("accept failed: {error}"))?;
                let (read, write) = socket.into_split();
                if let Err(error) = server.serve(read, write).await {
                    report(&format!("connection ended with error: {error}"));
                }
            }
        }
    }
}

/// Waits for SIGINT or SIGTERM, returning the signal name.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(sigterm) => sigterm,
            Err(_) => {
                let _ = ctrl_c.await;
                return "SIGINT";
            }
        };
        tokio::select! {
            _ = ctrl_c => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        "SIGINT"
    }
}

// ============================================================================
// SECTION: Configuration Loading
// ============================================================================

/// Loads the configuration file, or defaults when no path is given.
fn load_config(path: Option<&std::path::Path>) -> Result<ShorewatchConfig, String> {
    let Some(path) = path else {
        return Ok(ShorewatchConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|error| format!("cannot read {}: {error}", path.display()))?;
    toml::from_str(&raw).map_err(|error| format!("cannot parse {}: {error}", path.display()))
}

/// Reports an operator-facing message on stderr.
#[allow(clippy::print_stderr, reason = "Operator diagnostics belong on stderr.")]
fn report(message: &str) {
    eprintln!("shorewatch: {message}");
}
