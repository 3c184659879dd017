//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use stigquery::processor::{
    BenchmarkStatistics, ProcessingOptions, ProcessingResult, ValidationReport,
};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print a subheader
pub fn subheader(msg: &str) {
    println!("\n{}", msg.bold());
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Print the processing result summary
pub fn print_result(result: &ProcessingResult, options: &ProcessingOptions) {
    success("STIG processing complete");

    subheader("Processing Summary:");
    println!("  Total rules processed: {}", result.total);
    println!(
        "  Automatable rules: {} ({:.1}%)",
        result.automatable,
        percent(result.automatable, result.total)
    );
    println!(
        "  Manual review required: {} ({:.1}%)",
        result.manual_review,
        percent(result.manual_review, result.total)
    );
    println!("  Policies generated: {}", result.policies.len());
    println!("  Processing time: {:?}", result.duration);

    if !result.errors.is_empty() {
        println!(
            "  Errors encountered: {}",
            result.errors.len().to_string().yellow()
        );
    }

    print_severity_breakdown(result);

    if options.dry_run {
        warning("Dry run mode - no files written");
    } else {
        subheader("Output:");
        println!("  Location: {}", options.output_dir.display());
        println!("  Format: {}", options.format);
        if let Some(severity) = options.severity {
            println!(
                "  Severity filter: {} ({})",
                severity.as_str(),
                severity.to_cat()
            );
        }
    }

    let rate = percent(result.automatable, result.total);
    println!();
    if rate >= 70.0 {
        success(&format!("Good automation coverage: {rate:.1}% of rules can be automated"));
    } else if rate >= 40.0 {
        info(&format!("Moderate automation coverage: {rate:.1}% of rules can be automated"));
    } else {
        warning(&format!("Low automation coverage: {rate:.1}% of rules can be automated"));
    }
}

/// Print warnings and non-fatal errors from a run
pub fn print_run_errors(result: &ProcessingResult) {
    if result.errors.is_empty() {
        return;
    }

    subheader("Warnings and non-critical errors:");
    for err in &result.errors {
        let kind = format!("{:?}", err.kind).dimmed();
        println!("  {} {} {}", "•".yellow(), kind, err.message);
        if !err.group_id.is_empty() {
            println!("    Rule: {}", err.group_id.dimmed());
        }
    }
}

fn severity_dot(severity: &str) -> colored::ColoredString {
    match severity {
        "high" => "●".red(),
        "medium" => "●".yellow(),
        "low" => "●".green(),
        _ => "●".normal(),
    }
}

/// Print the generated policies bucketed by severity label
fn print_severity_breakdown(result: &ProcessingResult) {
    if result.policies.is_empty() {
        return;
    }

    subheader("Breakdown by Severity:");

    let mut counts = std::collections::HashMap::new();
    let mut critical = 0usize;
    for policy in &result.policies {
        let severity = policy
            .metadata
            .labels
            .get("stig.severity")
            .map(String::as_str)
            .unwrap_or("unknown");
        *counts.entry(severity.to_string()).or_insert(0usize) += 1;
        if policy.spec.critical {
            critical += 1;
        }
    }

    for severity in ["high", "medium", "low", "unknown"] {
        if let Some(count) = counts.get(severity) {
            println!("  {} {}: {}", severity_dot(severity), severity, count);
        }
    }

    if critical > 0 {
        println!("  {} Critical policies: {}", "⚡".yellow(), critical);
    }
}

/// Print benchmark composition statistics
pub fn print_statistics(stats: &BenchmarkStatistics) {
    header("STIG Statistics");

    subheader("File Information:");
    println!("  Title: {}", stats.title);
    println!("  Version: {}", stats.version);
    println!("  Total Rules: {}", stats.total_rules);
    println!("  Analysis Time: {:?}", stats.analysis_time);

    subheader("Rule Categories:");
    println!(
        "  Registry Checks: {} ({:.1}%)",
        stats.registry_rules,
        percent(stats.registry_rules, stats.total_rules)
    );
    println!(
        "  Group Policy: {} ({:.1}%)",
        stats.group_policy_rules,
        percent(stats.group_policy_rules, stats.total_rules)
    );
    println!(
        "  Manual Review: {} ({:.1}%)",
        stats.manual_rules,
        percent(stats.manual_rules, stats.total_rules)
    );

    if !stats.severity_distribution.is_empty() {
        subheader("Severity Distribution:");
        for severity in ["high", "medium", "low"] {
            if let Some(count) = stats.severity_distribution.get(severity) {
                println!(
                    "  {} {}: {} ({:.1}%)",
                    severity_dot(severity),
                    severity,
                    count,
                    percent(*count, stats.total_rules)
                );
            }
        }
    }
    println!();
}

/// Print the policy-file validation report
pub fn print_validation_report(report: &ValidationReport) {
    header("Validating Fleet Policies");

    if report.valid {
        success("All policies are valid");
        println!("Validated {} policy files", report.count);
    } else {
        error("Validation failed");
        println!();
        for err in &report.errors {
            println!("  {} {}: {}", "•".red(), err.file, err.message);
        }
    }
    println!();
}

/// Print a progress spinner for long operations
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_success(self, msg: &str) {
        self.pb.finish_and_clear();
        success(msg);
    }

    pub fn finish_error(self, msg: &str) {
        self.pb.finish_and_clear();
        error(msg);
    }
}

/// Print a JSON report
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print the CLI banner
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", format!("stigquery v{}", version).bold());
    println!(
        "{}",
        "DISA STIG to Fleet/osquery policy converter".dimmed()
    );
}
