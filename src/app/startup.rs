use std::io::IsTerminal;

use clap::Parser;

use crate::app::cli::args::Args;
use crate::app::cli::config::AppConfig;
use crate::app::runner::DemoRunner;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::{ShutdownCoordinator, ShutdownReason};
use crate::core::version;

/// Initialize application startup
pub fn startup() {
    let args = Args::parse();

    // Stage 1: configuration file plus command-line overrides
    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.show_config {
        match config.to_toml_string() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Stage 2: logging
    let use_color = config
        .logging
        .color
        .unwrap_or_else(|| std::io::stderr().is_terminal());
    if let Err(e) = init_logging(
        &config.logging.level,
        config.log_format(),
        config.logging.file.as_deref(),
        use_color,
    ) {
        eprintln!("Error: cannot initialise logging: {}", e);
        std::process::exit(1);
    }
    log::info!("{}", version::banner());
    log::debug!("Effective configuration: {:?}", config);

    // Stage 3: queues and FT members on their own threads
    let runner = match DemoRunner::start(&config) {
        Ok(runner) => runner,
        Err(e) => {
            log_error_with_context(&e, "Starting queue group and FT members");
            std::process::exit(1);
        }
    };

    // Stage 4: wait for a signal or the run deadline
    let reason = match wait_for_shutdown(&config) {
        Ok(reason) => reason,
        Err(e) => {
            log::error!("FATAL: cannot start shutdown runtime: {}", e);
            ShutdownReason::Requested
        }
    };
    match reason {
        ShutdownReason::Deadline => log::info!("Run time elapsed, shutting down"),
        ShutdownReason::Requested => log::info!("Shutdown requested"),
    }
    runner.log_summary();

    if let Err(e) = runner.shutdown() {
        log_error_with_context(&e, "Shutting down queue group");
        std::process::exit(1);
    }
    log::info!("Shutdown complete");
}

fn resolve_config(args: &Args) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(args.config_file.as_deref())?;
    config.apply_args(args)?;
    Ok(config)
}

fn wait_for_shutdown(config: &AppConfig) -> std::io::Result<ShutdownReason> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    Ok(runtime.block_on(async {
        let coordinator = ShutdownCoordinator::new();
        coordinator.install_signal_handlers();
        coordinator.wait(config.run_duration()).await
    }))
}
