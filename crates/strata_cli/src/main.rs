//! Strata CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use strata_compose::ComposeError;
use strata_resources::ResourceError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    // Logs go to stderr so synthesized JSON on stdout stays clean.
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,strata={}", level))),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Synth(args) => commands::synth::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Resources(args) => commands::resources::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ComposeError>() {
            return categorize_compose_error(err);
        }
        if let Some(err) = cause.downcast_ref::<ResourceError>() {
            return categorize_resource_error(err);
        }
        if cause.downcast_ref::<commands::UsageError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}

fn categorize_compose_error(err: &ComposeError) -> u8 {
    match err.root() {
        ComposeError::Resource(e) => categorize_resource_error(e),
        ComposeError::InvalidTemplate { .. }
        | ComposeError::UnknownArchitecture(_)
        | ComposeError::InvalidParameters { .. }
        | ComposeError::UnknownReference { .. }
        | ComposeError::DuplicateInstance(_)
        | ComposeError::Yaml(_)
        | ComposeError::Json(_) => ExitCodes::TEMPLATE_ERROR,
        _ => ExitCodes::GENERAL_ERROR,
    }
}

fn categorize_resource_error(err: &ResourceError) -> u8 {
    match err {
        ResourceError::Validation { .. } => ExitCodes::VALIDATION_FAILURE,
        ResourceError::UnknownResourceType(_) => ExitCodes::TEMPLATE_ERROR,
        ResourceError::Pricing { .. } => ExitCodes::INVALID_ARGS,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
