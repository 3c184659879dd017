//! Batch processing pipeline
//!
//! Drives the rule-by-rule workflow: load and bound the input benchmark,
//! filter by severity, extract and validate registry checks, assemble
//! policies, and persist one file per policy plus a run summary.
//!
//! Processing is single-threaded and synchronous; per-rule work is pure
//! sub-millisecond computation, so the only cancellation points are a
//! cooperative deadline check before parsing and after the batch. A
//! failed rule never aborts the batch: it is recorded and the run
//! continues.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::benchmark::{Severity, StigBenchmark, StigRule};
use crate::error::{Error, Result};
use crate::policy::{self, Policy};
use crate::registry::{extract_checks, validate_checks};
use crate::summary::ProcessingSummary;

/// Maximum accepted input file size (100 MiB)
pub const MAX_INPUT_SIZE: u64 = 100 * 1024 * 1024;

/// Default processing deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Phrases indicating a rule is verified through Group Policy tooling
/// rather than a direct registry read
const GROUP_POLICY_INDICATORS: [&str; 7] = [
    "group policy",
    "gpedit.msc",
    "local group policy editor",
    "computer configuration >> administrative templates",
    "user configuration >> administrative templates",
    "gpresult",
    "administrative templates",
];

/// Output serialization format for policies and the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Parse a format string, rejecting anything but `yaml`/`json`
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidFormat {
                value: other.to_string(),
            }),
        }
    }

    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse a severity filter string, rejecting unknown levels
pub fn parse_severity_filter(s: &str) -> Result<Option<Severity>> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    match Severity::from_level(s) {
        Severity::Unknown => Err(Error::InvalidSeverity {
            value: s.to_string(),
        }),
        level => Ok(Some(level)),
    }
}

/// Options controlling a processing run
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Path to the STIG benchmark JSON
    pub input: PathBuf,
    /// Directory receiving policy files and the summary
    pub output_dir: PathBuf,
    /// Serialization format for outputs
    pub format: OutputFormat,
    /// Only process rules of this severity when set
    pub severity: Option<Severity>,
    /// Skip all file writes
    pub dry_run: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Overall wall-clock deadline
    pub timeout: Duration,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("output"),
            format: OutputFormat::Yaml,
            severity: None,
            dry_run: false,
            pretty: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Kinds of non-fatal processing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingErrorKind {
    ParsingFailed,
    ValidationFailed,
    FileWriteFailed,
    Cancelled,
}

/// A non-fatal error recorded against one rule (or the run itself)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingError {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_id: String,
    pub message: String,
    pub kind: ProcessingErrorKind,
    pub timestamp: String,
}

impl ProcessingError {
    fn for_rule(rule: &StigRule, kind: ProcessingErrorKind, message: impl Into<String>) -> Self {
        Self {
            group_id: rule.group_id.clone(),
            rule_id: rule.rule_id.clone(),
            message: message.into(),
            kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn for_run(kind: ProcessingErrorKind, message: impl Into<String>) -> Self {
        Self {
            group_id: String::new(),
            rule_id: String::new(),
            message: message.into(),
            kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Aggregate outcome of one processing run
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    /// Rules considered (after severity filtering)
    pub total: usize,
    /// Rules that produced at least one validated registry check
    pub automatable: usize,
    /// Rules left to manual review
    pub manual_review: usize,
    /// Policies that survived validation
    pub policies: Vec<Policy>,
    /// Non-fatal errors recorded during the run
    pub errors: Vec<ProcessingError>,
    /// Wall-clock processing time
    pub duration: Duration,
}

impl ProcessingResult {
    fn write_error_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.kind == ProcessingErrorKind::FileWriteFailed)
            .count()
    }
}

/// Benchmark composition statistics (statistics-only mode)
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkStatistics {
    pub title: String,
    pub version: String,
    pub total_rules: usize,
    /// Rules with at least one extractable registry check
    pub registry_rules: usize,
    /// Rules matched by the Group Policy indicator phrases
    pub group_policy_rules: usize,
    /// Everything else
    pub manual_rules: usize,
    pub severity_distribution: BTreeMap<String, usize>,
    #[serde(skip)]
    pub analysis_time: Duration,
}

/// Result of validating existing policy files on disk
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub count: usize,
    pub errors: Vec<FileValidationError>,
}

/// One invalid policy file
#[derive(Debug, Clone)]
pub struct FileValidationError {
    pub file: String,
    pub message: String,
}

/// The batch processor
pub struct Processor {
    options: ProcessingOptions,
}

impl Processor {
    pub fn new(options: ProcessingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Run the full pipeline: parse, classify, assemble, persist
    pub fn run(&self) -> Result<ProcessingResult> {
        let start = Instant::now();
        let mut result = ProcessingResult::default();

        if !self.options.dry_run {
            fs::create_dir_all(&self.options.output_dir).map_err(|e| Error::OutputDir {
                path: self.options.output_dir.clone(),
                source: e,
            })?;
        }

        // Cooperative deadline check before parsing
        if start.elapsed() >= self.options.timeout {
            result
                .errors
                .push(ProcessingError::for_run(
                    ProcessingErrorKind::Cancelled,
                    "processing deadline exceeded before parsing",
                ));
            result.duration = start.elapsed();
            return Ok(result);
        }

        let benchmark = self.load_benchmark()?;
        info!(
            title = %benchmark.title,
            version = %benchmark.version,
            rules = benchmark.groups.len(),
            "parsed STIG benchmark"
        );

        let groups = self.filter_rules(&benchmark.groups);
        result.total = groups.len();

        for rule in &groups {
            self.process_rule(rule, &mut result);
        }

        result.duration = start.elapsed();

        // Cooperative deadline check after the batch; advisory only, it
        // never invalidates policies already produced
        if result.duration >= self.options.timeout {
            result.errors.push(ProcessingError::for_run(
                ProcessingErrorKind::Cancelled,
                "processing deadline exceeded",
            ));
        }

        if !self.options.dry_run {
            if let Err(e) = self.write_summary(&result) {
                warn!(error = %e, "failed to write summary");
                result.errors.push(ProcessingError::for_run(
                    ProcessingErrorKind::FileWriteFailed,
                    format!("failed to write summary: {e}"),
                ));
            }
        }

        self.review(&result)?;
        Ok(result)
    }

    /// Classify one rule and, when automatable, assemble and persist its
    /// policy
    fn process_rule(&self, rule: &StigRule, result: &mut ProcessingResult) {
        let extracted = extract_checks(&rule.rule_check_content);

        // Drop checks the validator flags; policy validation remains the
        // final gate, but garbage should not reach the synthesizer
        let validation_errors = validate_checks(&extracted);
        for err in &validation_errors {
            result.errors.push(ProcessingError::for_rule(
                rule,
                ProcessingErrorKind::ValidationFailed,
                err.to_string(),
            ));
        }
        let flagged: Vec<usize> = validation_errors.iter().map(|e| e.check_index).collect();
        let checks: Vec<_> = extracted
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !flagged.contains(&(i + 1)))
            .map(|(_, c)| c)
            .collect();

        if checks.is_empty() {
            result.manual_review += 1;
            info!("[MANUAL] {}: {}", rule.group_id, rule.rule_title);
            return;
        }

        result.automatable += 1;
        info!("[AUTOMATABLE] {}: {}", rule.group_id, rule.rule_title);

        let policy = match policy::assemble(rule, &checks) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(group_id = %rule.group_id, error = %e, "generated policy failed validation");
                result.errors.push(ProcessingError::for_rule(
                    rule,
                    ProcessingErrorKind::ValidationFailed,
                    e.to_string(),
                ));
                return;
            }
        };

        if !self.options.dry_run {
            if let Err(e) = self.write_policy(&policy) {
                warn!(policy = %policy.metadata.name, error = %e, "failed to write policy");
                result.errors.push(ProcessingError::for_rule(
                    rule,
                    ProcessingErrorKind::FileWriteFailed,
                    format!("failed to write policy: {e}"),
                ));
            }
        }

        result.policies.push(policy);
    }

    /// Load the benchmark JSON, enforcing the input size bound
    pub fn load_benchmark(&self) -> Result<StigBenchmark> {
        let path = &self.options.input;
        let metadata = fs::metadata(path).map_err(|e| Error::InputRead {
            path: path.clone(),
            source: e,
        })?;
        enforce_input_bound(path, metadata.len())?;

        let data = fs::read_to_string(path).map_err(|e| Error::InputRead {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&data).map_err(|e| Error::InputParse {
            path: path.clone(),
            source: e,
        })
    }

    fn filter_rules(&self, rules: &[StigRule]) -> Vec<StigRule> {
        match self.options.severity {
            None => rules.to_vec(),
            Some(level) => rules
                .iter()
                .filter(|r| r.rule_severity == level)
                .cloned()
                .collect(),
        }
    }

    /// Persist a single policy as `<name>.<ext>` in the output directory
    fn write_policy(&self, policy: &Policy) -> Result<PathBuf> {
        let data = self.marshal(policy)?;
        let filename = format!("{}.{}", policy.metadata.name, self.options.format.extension());
        let path = self.options.output_dir.join(filename);
        fs::write(&path, data)?;
        Ok(path)
    }

    fn write_summary(&self, result: &ProcessingResult) -> Result<PathBuf> {
        let summary = ProcessingSummary::from_result(result);
        let data = self.marshal(&summary)?;
        let filename = format!("stig-summary.{}", self.options.format.extension());
        let path = self.options.output_dir.join(filename);
        fs::write(&path, data)?;
        Ok(path)
    }

    fn marshal<T: Serialize>(&self, value: &T) -> Result<String> {
        match self.options.format {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Json if self.options.pretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
        }
    }

    /// Post-run review: escalate empty output and write failures
    fn review(&self, result: &ProcessingResult) -> Result<()> {
        if result.automatable > 0 && result.policies.is_empty() {
            return Err(Error::NoPoliciesProduced {
                automatable: result.automatable,
            });
        }

        let write_errors = result.write_error_count();
        if write_errors > 0 && !self.options.dry_run {
            return Err(Error::WriteFailures {
                count: write_errors,
            });
        }

        Ok(())
    }

    /// Analyze the benchmark composition without generating anything
    pub fn statistics(&self) -> Result<BenchmarkStatistics> {
        let start = Instant::now();
        let benchmark = self.load_benchmark()?;

        let mut stats = BenchmarkStatistics {
            title: benchmark.title.clone(),
            version: benchmark.version.clone(),
            total_rules: benchmark.groups.len(),
            registry_rules: 0,
            group_policy_rules: 0,
            manual_rules: 0,
            severity_distribution: BTreeMap::new(),
            analysis_time: Duration::ZERO,
        };

        for rule in &benchmark.groups {
            *stats
                .severity_distribution
                .entry(rule.rule_severity.as_str().to_string())
                .or_insert(0) += 1;

            if !extract_checks(&rule.rule_check_content).is_empty() {
                stats.registry_rules += 1;
            } else if is_group_policy_rule(&rule.rule_check_content) {
                stats.group_policy_rules += 1;
            } else {
                stats.manual_rules += 1;
            }
        }

        stats.analysis_time = start.elapsed();
        Ok(stats)
    }

    /// Validate previously written policy files in the output directory
    ///
    /// Only `stig-*.{yaml,yml,json}` files are considered; each must
    /// parse into a policy and pass structural validation.
    pub fn validate_output(&self) -> Result<ValidationReport> {
        let dir = &self.options.output_dir;
        let mut report = ValidationReport {
            valid: true,
            ..Default::default()
        };

        if !dir.exists() {
            return Ok(report);
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| Error::DirRead {
                path: dir.clone(),
                source: e,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for path in entries {
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !filename.starts_with("stig-") || filename.starts_with("stig-summary") {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !matches!(ext, "yaml" | "yml" | "json") {
                continue;
            }

            report.count += 1;
            if let Err(message) = validate_policy_file(&path, ext) {
                report.valid = false;
                report.errors.push(FileValidationError {
                    file: filename.to_string(),
                    message,
                });
            }
        }

        Ok(report)
    }
}

/// Reject input files exceeding the size bound before any parsing
fn enforce_input_bound(path: &Path, size: u64) -> Result<()> {
    if size > MAX_INPUT_SIZE {
        return Err(Error::InputTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_INPUT_SIZE,
        });
    }
    Ok(())
}

fn validate_policy_file(path: &Path, ext: &str) -> std::result::Result<(), String> {
    let data = fs::read_to_string(path).map_err(|e| format!("failed to read file: {e}"))?;

    let parsed: std::result::Result<Policy, String> = if ext == "json" {
        serde_json::from_str(&data).map_err(|e| format!("invalid JSON syntax: {e}"))
    } else {
        serde_yaml::from_str(&data).map_err(|e| format!("invalid YAML syntax: {e}"))
    };

    let policy = parsed?;
    policy::validate(&policy).map_err(|e| e.to_string())
}

/// Whether a rule's check text points at Group Policy tooling
///
/// Used only for classification in statistics; Group Policy rules are
/// not automatable through the registry table.
pub fn is_group_policy_rule(check_content: &str) -> bool {
    let lower = check_content.to_lowercase();
    GROUP_POLICY_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}
