//! stigquery CLI - Convert DISA STIG rules to Fleet/osquery policies
//!
//! This tool parses STIG benchmark JSON exports, generates Fleet policy
//! files backed by osquery registry checks, validates previously
//! generated policies, and builds the unified browsing schema.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use stigquery::processor::{
    parse_severity_filter, OutputFormat, ProcessingOptions, Processor, DEFAULT_TIMEOUT,
};
use stigquery::schema::Combiner;

mod error;
mod output;

use error::{CliError, Result};

const DEFAULT_INPUT: &str = "microsoft-windows-11-security-technical-implementation-guide.json";

/// stigquery - DISA STIG to Fleet/osquery policy converter
#[derive(Parser)]
#[command(name = "stigquery")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert STIG rules into Fleet policy files
    Process {
        /// Input STIG JSON file
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Output directory for Fleet policies
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Filter by severity: low, medium, high
        #[arg(short, long, default_value = "")]
        severity: String,

        /// Don't write files, just report what would be generated
        #[arg(long)]
        dry_run: bool,

        /// Pretty print JSON output
        #[arg(long)]
        pretty: bool,

        /// Processing timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show benchmark composition statistics
    Stats {
        /// Input STIG JSON file
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate previously generated policy files
    Validate {
        /// Directory containing policy files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Build the unified browsing schema from a benchmark
    Combine {
        /// Input STIG JSON file
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Directory of .xml/.ps1 remediation files to link by title
        #[arg(long)]
        fix_dir: Option<PathBuf>,

        /// Output file for the combined schema
        #[arg(short, long, default_value = "benchmark-data.json")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            input,
            output,
            format,
            severity,
            dry_run,
            pretty,
            timeout,
        } => cmd_process(input, output, &format, &severity, dry_run, pretty, timeout),

        Commands::Stats { input, json } => cmd_stats(input, json),

        Commands::Validate { output } => cmd_validate(output),

        Commands::Combine {
            input,
            fix_dir,
            output,
        } => cmd_combine(input, fix_dir, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "stigquery=debug,stigquery_cli=debug"
    } else {
        "stigquery=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Command Implementations
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    input: PathBuf,
    output_dir: PathBuf,
    format: &str,
    severity: &str,
    dry_run: bool,
    pretty: bool,
    timeout: Option<u64>,
) -> Result<()> {
    if !input.exists() {
        return Err(CliError::InputNotFound { path: input });
    }

    let options = ProcessingOptions {
        input,
        output_dir,
        format: OutputFormat::parse(format)?,
        severity: parse_severity_filter(severity)?,
        dry_run,
        pretty,
        timeout: timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT),
    };

    output::print_banner();
    println!();

    let spinner = output::Spinner::new("Processing STIG rules...");
    let processor = Processor::new(options);
    let result = match processor.run() {
        Ok(result) => {
            spinner.finish_success("Processing finished");
            result
        }
        Err(e) => {
            spinner.finish_error("Processing failed");
            return Err(e.into());
        }
    };

    output::print_result(&result, processor.options());
    output::print_run_errors(&result);
    Ok(())
}

fn cmd_stats(input: PathBuf, json: bool) -> Result<()> {
    if !input.exists() {
        return Err(CliError::InputNotFound { path: input });
    }

    let options = ProcessingOptions {
        input,
        ..Default::default()
    };
    let stats = Processor::new(options).statistics()?;

    if json {
        output::print_json(&stats)?;
    } else {
        output::print_statistics(&stats);
    }
    Ok(())
}

fn cmd_validate(output_dir: PathBuf) -> Result<()> {
    let options = ProcessingOptions {
        output_dir,
        ..Default::default()
    };
    let report = Processor::new(options).validate_output()?;

    output::print_validation_report(&report);

    if !report.valid {
        return Err(CliError::InvalidPolicies {
            count: report.errors.len(),
        });
    }
    Ok(())
}

fn cmd_combine(input: PathBuf, fix_dir: Option<PathBuf>, output: PathBuf) -> Result<()> {
    if !input.exists() {
        return Err(CliError::InputNotFound { path: input });
    }
    if let Some(dir) = &fix_dir {
        if !dir.is_dir() {
            return Err(CliError::FixDirNotFound { path: dir.clone() });
        }
    }

    let spinner = output::Spinner::new("Combining benchmark data...");
    let combiner = Combiner::new(input, fix_dir);
    let data = match combiner.combine() {
        Ok(data) => data,
        Err(e) => {
            spinner.finish_error("Combining failed");
            return Err(e.into());
        }
    };

    let json = serde_json::to_string_pretty(&data)?;
    std::fs::write(&output, json).map_err(|e| CliError::FileWrite {
        path: output.clone(),
        source: e,
    })?;

    let rules: usize = data.categories.iter().map(|c| c.rules.len()).sum();
    spinner.finish_success(&format!(
        "Wrote {} rules in {} categories to {}",
        rules,
        data.categories.len(),
        output.display()
    ));
    Ok(())
}
