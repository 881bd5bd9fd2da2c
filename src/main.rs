//! # ToolBridge - OpenAI-compatible tool calling for a chat gateway
//!
//! Serves `/v1/chat/completions` for OpenAI-style clients and forwards the
//! requests to the upstream chat gateway, translating tool definitions and
//! tool calls on the way.
//!
//! ## Configuration
//!
//! Layered: built-in defaults, `/etc/toolbridge/config.toml`, the user config
//! file, then `TOOLBRIDGE_*` environment variables (a `.env` file is loaded
//! first).
//!
//! ```bash
//! export TOOLBRIDGE_SERVER_PORT=7285
//! export TOOLBRIDGE_SERVER_LOG_LEVEL=debug
//! export TOOLBRIDGE_TOOLS_FORCE_PROMPT_MODE=false
//! ```
//!
//! ## API Usage
//!
//! ```bash
//! curl -X POST http://localhost:7285/v1/chat/completions \
//!   -H "Authorization: Bearer $USER" \
//!   -H "Content-Type: application/json" \
//!   -d '{"model": "gpt4o", "messages": [{"role": "user", "content": "Hello!"}]}'
//! ```
//!
//! Authors: Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;

use anyhow::Context;
use axum::Router;
use tracing::info;

use toolbridge::config::cli::ConfigCli;
use toolbridge::config::validation::ConfigValidator;
use toolbridge::config::{Config, paths};
use toolbridge::logging::init_logging;
use toolbridge::provider::ModelRegistry;
use toolbridge::{ValidationSeverity, create_app};

/* --- constants ------------------------------------------------------------------------------ */

/** the version as defined in cargo.toml */
const VERSION: &str = env!("CARGO_PKG_VERSION");

/* --- start of code -------------------------------------------------------------------------- */

///
/// Main application entry point.
///
/// Handles CLI commands, then loads configuration, initializes logging and
/// serves the bridge until interrupted.
#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Handle CLI arguments before config loading
    handle_cli_args();

    if let Err(e) = run().await {
        // Print error message line by line to ensure proper formatting
        eprintln!("Error:");
        for line in format!("{:#}", e).lines() {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config)?;
    config.validate()?;

    let app = create_app(config.clone()).context("Failed to create application")?;
    start_server(&config, app).await
}

///
/// Handle command line arguments like --version and --help before config loading.
fn handle_cli_args() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return;
    }

    match args[1].as_str() {
        "--version" | "-V" => {
            println!("toolbridge {}", VERSION);
            std::process::exit(0);
        }
        "--help" | "-h" => {
            print_help();
            std::process::exit(0);
        }
        "doctor" => {
            run_doctor();
            std::process::exit(0);
        }
        "validate" => {
            let exit_code = run_validate();
            std::process::exit(exit_code);
        }
        "config" => {
            let exit_code = match ConfigCli::run(&args[2..]) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("[ERROR] {}", e);
                    1
                }
            };
            std::process::exit(exit_code);
        }
        other => {
            if other.starts_with('-') {
                eprintln!("Error: Unknown option: {}", other);
            } else {
                eprintln!("Error: Unknown command: {}", other);
            }
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    }
}

///
/// Print help information for the ToolBridge CLI.
fn print_help() {
    println!("ToolBridge v{}", VERSION);
    println!("OpenAI-compatible tool calling bridge for the upstream chat gateway");
    println!();
    println!("USAGE:");
    println!("    toolbridge [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    doctor                  Check configuration and system health");
    println!("    validate                Validate configuration and exit");
    println!("    config init [--force]   Write an example configuration file");
    println!("    config show             Print the effective configuration");
    println!("    config validate         Validate configuration with details");
    println!("    config path             List configuration file locations");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help              Print help information");
    println!("    -V, --version           Print version information");
    println!();
    println!("ENVIRONMENT VARIABLES (override config files):");
    println!("    TOOLBRIDGE_SERVER_PORT                  Server port (default: 7285)");
    println!("    TOOLBRIDGE_SERVER_LOG_LEVEL             trace, debug, info, warn, error (default: info)");
    println!("    TOOLBRIDGE_SERVER_LOG_FILE              Also write logs to this file");
    println!("    TOOLBRIDGE_SERVER_VERBOSE               Debug logging with payload dumps");
    println!("    TOOLBRIDGE_SERVER_DEFAULT_USER          User for requests without a bearer token");
    println!("    TOOLBRIDGE_UPSTREAM_PROD_CHAT_URL       Production chat endpoint");
    println!("    TOOLBRIDGE_UPSTREAM_DEV_CHAT_URL        Development chat endpoint");
    println!("    TOOLBRIDGE_UPSTREAM_STREAM_URL          Streaming chat endpoint");
    println!("    TOOLBRIDGE_UPSTREAM_TIMEOUT_SECS        Upstream timeout (default: 300)");
    println!("    TOOLBRIDGE_TOOLS_FORCE_PROMPT_MODE      Always use prompt-based tool calling");
    println!("    TOOLBRIDGE_STREAMING_*                  Streaming emulation settings");
    println!();
    println!("EXAMPLES:");
    println!("    toolbridge                  Start the bridge");
    println!("    toolbridge doctor           Check configuration");
    println!("    toolbridge config init      Create ~/.config/toolbridge/config.toml");
}

///
/// Run the doctor command to check configuration and system health.
fn run_doctor() {
    println!("ToolBridge Doctor - Configuration Health Check");
    println!("{}", "=".repeat(60));
    println!();

    if std::path::Path::new(".env").exists() {
        println!("[OK] Found .env file");
    } else {
        println!("[INFO] No .env file found");
    }

    println!();
    println!("Configuration Files:");
    for path in paths::config_file_paths() {
        let status = if path.exists() { "[OK] found" } else { "[INFO] not present" };
        println!("  {} {}", status, path.display());
    }

    let overrides: Vec<String> = env::vars().map(|(k, _)| k).filter(|k| k.starts_with("TOOLBRIDGE_")).collect();
    if !overrides.is_empty() {
        println!();
        println!("Environment Overrides:");
        for key in overrides {
            println!("  [OK] {}", key);
        }
    }

    println!();
    println!("Configuration Validation:");
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            println!("  [ERROR] Failed to load configuration:");
            println!("     {}", e);
            return;
        }
    };
    println!("  [OK] Configuration loaded successfully");

    let issues = ConfigValidator::new(&config).issues();
    let errors = issues.iter().filter(|i| i.severity == ValidationSeverity::Error).count();
    for issue in &issues {
        let tag = match issue.severity {
            ValidationSeverity::Error => "[ERROR]",
            ValidationSeverity::Warning => "[WARNING]",
        };
        println!("  {} {}", tag, issue);
    }

    println!();
    println!("Routing:");
    println!("  {} upstream models available", ModelRegistry::builtin().upstream_ids().len());
    println!("  Tool strategy: {}", if config.tools.force_prompt_mode { "prompt-based only" } else { "native with prompt fallback" });

    println!();
    match std::net::TcpListener::bind(format!("127.0.0.1:{}", config.server.port)) {
        Ok(_) => println!("[OK] Port {} appears to be available", config.server.port),
        Err(_) => println!("[WARNING] Port {} may be in use", config.server.port),
    }

    if errors == 0 {
        println!("[SUCCESS] Configuration looks good! You're ready to run ToolBridge.");
    } else {
        println!("[ERROR] Configuration has {} error(s). Please fix them before running ToolBridge.", errors);
    }
}

///
/// Run the validate command to validate configuration and exit.
///
/// Returns exit code 0 if valid, 1 if invalid.
fn run_validate() -> i32 {
    match Config::load().and_then(|config| config.validate()) {
        Ok(()) => {
            println!("[OK] Configuration is valid");
            0
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            1
        }
    }
}

///
/// Start the HTTP server and log startup information.
///
/// # Arguments
///  * `config` - application configuration
///  * `app` - configured Axum application
///
/// # Returns
///  * `Ok(())` when the server shuts down gracefully
async fn start_server(config: &Config, app: Router) -> anyhow::Result<()> {
    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await.with_context(|| {
        format!(
            "Failed to bind to port {}\n\n\
             To fix this:\n\
             • Find the process using the port: lsof -i :{}\n\
             • Or change the port: export TOOLBRIDGE_SERVER_PORT=7286\n\n\
             Run 'toolbridge doctor' for more help.",
            port, port
        )
    })?;

    log_startup_info(config);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("Server error")?;

    info!("ToolBridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

///
/// Log startup information and configuration details.
fn log_startup_info(config: &Config) {
    info!("ToolBridge v{} running on port {}", VERSION, config.server.port);
    info!("OpenAI-compatible endpoint: http://localhost:{}/v1", config.server.port);
    if config.tools.force_prompt_mode {
        info!("Prompt-based tool calling forced for all models");
    }

    let level = config.effective_log_level();
    if level.is_trace_enabled() {
        info!("[{}] Debug logging is ENABLED - request and response payloads will be logged", level.as_str());
    }
}
