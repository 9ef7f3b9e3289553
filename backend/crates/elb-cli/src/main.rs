//! elb - headless host for the local inference server
//!
//! # Examples
//!
//! ```bash
//! # Check the bundle next to the executable
//! elb check --installed
//!
//! # Run from a source checkout until Ctrl-C
//! elb run --development --base-dir ~/src/edge-llm-base
//! ```

mod check;
mod cli;
mod commands;
mod error;
mod host;


use crate::{
    check::check_report, cli::Cli, commands::Commands, error::CliResult, host::HostContext,
};

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use elb_supervisor::{ServiceState, ServiceSupervisor, SupervisorConfig, logging};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let context = match HostContext::load(&cli) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run => run(&context).await,
        Commands::Check => Ok(check(&context)),
        Commands::Paths => {
            paths(&context);
            Ok(ExitCode::SUCCESS)
        }
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    })
}

async fn run(context: &HostContext) -> CliResult<ExitCode> {
    let log_dir = context.locator.log_dir(&context.config.logging);
    logging::init(&context.config.logging, &log_dir)?;
    context.config.log_summary();

    let config = Arc::new(SupervisorConfig::resolve(&context.config, &context.locator));
    let supervisor = ServiceSupervisor::new(config);

    let mut states = supervisor.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let snapshot = states.borrow_and_update().clone();
            info!(state = %snapshot.state, ready = snapshot.ready, "server {}", snapshot.state);
        }
    });

    let snapshot = supervisor.start().await;
    if snapshot.state == ServiceState::Failed {
        if let Some(fault) = &snapshot.last_error {
            error!("Server did not start: {fault}");
        }
        return Ok(ExitCode::FAILURE);
    }

    let mut failures = supervisor.subscribe();
    let crashed = tokio::select! {
        _ = shutdown_signal() => false,
        _ = failures.wait_for(|s| s.state == ServiceState::Failed) => true,
    };

    let outcome = supervisor.on_process_exit().await;
    info!(outcome = ?outcome, "supervisor finished");

    if crashed {
        if let Some(fault) = supervisor.current_state().last_error {
            error!("Server stopped running: {fault}");
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn check(context: &HostContext) -> ExitCode {
    let config = SupervisorConfig::resolve(&context.config, &context.locator);
    let report = check_report(&config);

    for line in &report.lines {
        println!("{line}");
    }

    if report.healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn paths(context: &HostContext) {
    let locator = &context.locator;
    let config = SupervisorConfig::resolve(&context.config, locator);

    println!("layout        {:?}", locator.kind());
    println!("base          {}", locator.base_dir().display());
    println!("resources     {}", locator.resource_root().display());
    println!("config        {}", context.config_dir.display());
    println!("runtime       {}", config.runtime.display());
    println!("launcher      {}", config.launcher.display());
    println!("model         {}", config.model.display());
    println!("logs          {}", locator.log_dir(&context.config.logging).display());
    for (key, value) in &config.env {
        println!("env           {key}={value}");
    }
}
