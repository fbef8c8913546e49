//! Moonbot Deploy Hook - Entry Point
//!
//! Listens for GitHub webhooks and redeploys the frontend on pushes to the
//! deploy branch.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use deployhook::app::options::AppOptions;
use deployhook::app::run::run;
use deployhook::app::settings::Settings;
use deployhook::logs::{flush_logs, init_logging, LogOptions};
use deployhook::utils::version_info;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Load settings: config file, then environment, then flags
    let config_file = cli_args.get("config").map(PathBuf::from);
    let mut settings = match Settings::load(config_file.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to load settings: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = settings.apply_cli(&cli_args) {
        eprintln!("Invalid command line: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        log_file: settings.log_file.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    install_panic_hook();

    let options = AppOptions::from_settings(&settings);
    info!("Running deploy hook with options: {:?}", options);

    let result = run(version.version, options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Deploy hook failed: {e}");
        flush_logs();
        std::process::exit(1);
    }
    flush_logs();
}

/// Any panic is fatal: log it and exit 1 rather than keep serving with
/// possibly inconsistent deployment state.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        error!("Uncaught panic: {panic_info}");
        error!("{backtrace}");
        flush_logs();
        std::process::exit(1);
    }));
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                }
            }
            _ => {
                warn!("Unable to install signal handlers, falling back to Ctrl+C");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down gracefully..."),
        Err(e) => {
            // Without any shutdown signal, serve until killed.
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
