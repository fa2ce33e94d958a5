//! portal-autologin - Main entry point
//!
//! Loads configuration, installs the run's log sink and hands over to the
//! retry controller. The process exit code is the run's `ExitStatus`.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use portal_autologin::cli::{Cli, Commands};
use portal_autologin::config_file::AutologinConfig;
use portal_autologin::controller::{Controller, ThreadSleeper};
use portal_autologin::http::ReqwestSession;
use portal_autologin::logging;
use portal_autologin::probe::Prober;
use portal_autologin::secrets;
use portal_autologin::types::ExitStatus;

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let status = match &cli.command {
        Some(Commands::Validate { file }) => validate_config(file),
        Some(Commands::ConfigInit { file }) => init_config(file),
        Some(Commands::Probe) => with_run_logging(&cli, probe_only),
        Some(Commands::Run) | None => with_run_logging(&cli, run_once),
    };

    ExitCode::from(status.code() as u8)
}

/// Load configuration and run `body` with the log sink installed.
fn with_run_logging(cli: &Cli, body: fn(&AutologinConfig) -> ExitStatus) -> ExitStatus {
    let config = match AutologinConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {:#}", e);
            return ExitStatus::ConfigurationError;
        }
    };

    let dispatch = match logging::build_dispatch(&config.log_file, cli.verbose) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("✗ Cannot open log file {:?}: {}", config.log_file, e);
            return ExitStatus::ConfigurationError;
        }
    };

    tracing::dispatcher::with_default(&dispatch, || body(&config))
}

fn build_session(config: &AutologinConfig) -> Result<ReqwestSession> {
    ReqwestSession::new(config.http_timeout(), &config.user_agent)
        .context("Failed to create HTTP session")
}

/// Single probe-login cycle
fn run_once(config: &AutologinConfig) -> ExitStatus {
    info!("portal-autologin {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Configured worst-case runtime: {}s",
        config.worst_case_runtime().as_secs()
    );

    let session = match build_session(config) {
        Ok(session) => session,
        Err(e) => {
            error!("{:#}", e);
            return ExitStatus::LoginFailed;
        }
    };
    let store = secrets::store_for(config.secret_backend);
    let sleeper = ThreadSleeper;

    let controller = Controller::new(config, &session, store.as_ref(), &sleeper);
    match controller.run() {
        Ok(report) => {
            let status = report.exit_status();
            info!("Run finished: {} (exit {})", report.final_state, status.code());
            status
        }
        Err(e) if e.is_configuration() => {
            error!("{}", e);
            eprintln!("✗ {}", e);
            ExitStatus::ConfigurationError
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            ExitStatus::LoginFailed
        }
    }
}

/// Probe only; exit 0 when direct, 1 when intercepted
fn probe_only(config: &AutologinConfig) -> ExitStatus {
    let session = match build_session(config) {
        Ok(session) => session,
        Err(e) => {
            error!("{:#}", e);
            return ExitStatus::LoginFailed;
        }
    };

    let result = Prober::new(&session, &config.probe_endpoints).probe();
    println!("{}", result);
    if result.is_intercepted() {
        ExitStatus::LoginFailed
    } else {
        ExitStatus::Connected
    }
}

fn validate_config(path: &Path) -> ExitStatus {
    match AutologinConfig::load_from_file(path).and_then(|c| c.validate()) {
        Ok(()) => {
            println!("✓ Configuration file is valid: {:?}", path);
            ExitStatus::Connected
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed: {:#}", e);
            ExitStatus::ConfigurationError
        }
    }
}

fn init_config(path: &Path) -> ExitStatus {
    match AutologinConfig::default().save_to_file(path) {
        Ok(()) => {
            println!("✓ Default configuration written to {:?}", path);
            ExitStatus::Connected
        }
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitStatus::ConfigurationError
        }
    }
}
