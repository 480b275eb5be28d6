//! medaudit CLI - Medication Data-Quality Auditor
//!
//! Command-line interface for medaudit operations. Invoked with no
//! subcommand it audits `medications_export.json` in the working directory
//! and prints the text report.

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod audit;

pub use audit::AuditArgs;

/// medaudit - Data-quality auditor for the medication reference table
#[derive(Parser)]
#[command(name = "medaudit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a medication export and print the report
    Check {
        #[command(flatten)]
        args: AuditArgs,
        /// Entries shown per sampled finding
        #[arg(long, default_value = "10")]
        preview: usize,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Exit with a failure status when any issue is found
        #[arg(long)]
        fail_on_issues: bool,
    },
    /// Generate the JSON audit summary
    Report {
        #[command(flatten)]
        args: AuditArgs,
        /// Output file for the summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the criticality table and matcher rules
    Rules {
        /// Criticality table to show instead of the built-in one (JSON)
        #[arg(long)]
        criticality: Option<PathBuf>,
    },
}

fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "medaudit=warn",
        1 => "medaudit=info",
        _ => "medaudit=debug",
    }
}

fn init_tracing(verbose: u8) {
    // Logs go to stderr so stdout stays a clean report.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose))),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the medaudit CLI.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => audit::cmd_audit_check(&AuditArgs::default(), 10, "text", false),
        Some(Commands::Check {
            args,
            preview,
            format,
            fail_on_issues,
        }) => audit::cmd_audit_check(&args, preview, &format, fail_on_issues),
        Some(Commands::Report { args, output }) => {
            audit::cmd_audit_report(&args, output.as_deref()).map(|()| false)
        }
        Some(Commands::Rules { criticality }) => {
            audit::cmd_rules(criticality.as_deref()).map(|()| false)
        }
    };

    match result {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
