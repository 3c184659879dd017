//! Fleet policy assembly and validation
//!
//! Wraps a synthesized query plus rule metadata into the policy document
//! shape consumed by Fleet. The envelope (`apiVersion`/`kind`/`metadata`/
//! `spec`) is an external, versioned contract; field names and constant
//! values are reproduced exactly for interoperability.

use std::collections::BTreeMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::benchmark::{Severity, StigRule};
use crate::registry::{synthesize_query, Comparison, RegistryCheck};

/// Fleet policy API version
pub const API_VERSION: &str = "v1";
/// Fleet policy document kind
pub const KIND_POLICY: &str = "policy";
/// Target platform for this benchmark
pub const PLATFORM_WINDOWS: &str = "windows";

/// Policy names are capped at the Kubernetes-style limit
const MAX_NAME_LEN: usize = 253;

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\-]").expect("valid regex"));
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));
static NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A Fleet policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Always [`API_VERSION`]
    pub api_version: String,
    /// Always [`KIND_POLICY`]
    pub kind: String,
    /// Policy metadata
    pub metadata: PolicyMeta,
    /// Policy specification
    pub spec: PolicySpec,
}

/// Policy metadata: stable name plus provenance labels and annotations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyMeta {
    /// Sanitized policy name, `stig-<group>-<rule-version>`
    pub name: String,

    /// Queryable provenance labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Free-form provenance annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Policy specification
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicySpec {
    /// Human-readable policy title
    pub name: String,
    /// Synthesized osquery SQL
    pub query: String,
    /// Composed description: discussion, check content, registry details
    pub description: String,
    /// Remediation instructions
    pub resolution: String,
    /// Target platform
    pub platform: String,
    /// True iff the source rule severity is high
    pub critical: bool,
}

/// Reasons a policy fails assembly or validation
///
/// These are non-fatal per rule: the offending policy is dropped and
/// recorded, and the run continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// No registry checks to synthesize from
    #[error("registry checks cannot be empty")]
    NoChecks,

    /// A required envelope field is empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Metadata name violates the naming contract
    #[error("invalid policy name format: {0}")]
    InvalidName(String),

    /// Query does not start with SELECT
    #[error("query must start with SELECT")]
    QueryNotSelect,

    /// Query does not reference the registry table
    #[error("query must select from the registry table")]
    QueryMissingRegistryTable,

    /// Query has no WHERE clause
    #[error("query must contain a WHERE clause")]
    QueryMissingWhere,

    /// Query contains a denylisted substring
    #[error("query contains potentially dangerous pattern: {0}")]
    DangerousPattern(String),
}

/// Assemble a validated Fleet policy from a rule and its registry checks
///
/// Synthesizes the query, builds the envelope, and runs structural and
/// SQL-shape validation before returning. A policy that fails
/// validation is never emitted.
pub fn assemble(rule: &StigRule, checks: &[RegistryCheck]) -> Result<Policy, PolicyError> {
    if checks.is_empty() {
        return Err(PolicyError::NoChecks);
    }

    let query = synthesize_query(checks);
    let name = sanitize_name(&format!("stig-{}-{}", rule.group_id, rule.rule_version));
    let critical = rule.rule_severity == Severity::High;

    let mut labels = BTreeMap::new();
    labels.insert("stig.group_id".to_string(), rule.group_id.clone());
    labels.insert("stig.rule_version".to_string(), rule.rule_version.clone());
    labels.insert(
        "stig.severity".to_string(),
        rule.rule_severity.as_str().to_string(),
    );
    labels.insert("stig.rule_id".to_string(), rule.rule_id.clone());
    labels.insert("compliance.type".to_string(), "stig".to_string());
    labels.insert("compliance.source".to_string(), "disa".to_string());

    let mut annotations = BTreeMap::new();
    annotations.insert("stig.rule_weight".to_string(), rule.rule_weight.clone());
    annotations.insert("stig.rule_ident".to_string(), rule.rule_ident.clone());
    annotations.insert(
        "stig.check_system".to_string(),
        rule.rule_check_system.clone(),
    );
    annotations.insert("stig.fix_id".to_string(), rule.rule_fix_id.clone());
    annotations.insert("generated.timestamp".to_string(), Utc::now().to_rfc3339());
    annotations.insert("generated.tool".to_string(), "stigquery".to_string());

    // Provenance for the primary check; siblings are only counted
    let primary = &checks[0];
    annotations.insert("registry.hive".to_string(), primary.hive.to_string());
    annotations.insert("registry.path".to_string(), primary.path.clone());
    annotations.insert(
        "registry.value_name".to_string(),
        primary.value_name.clone(),
    );
    annotations.insert(
        "registry.comparison".to_string(),
        primary.comparison.to_string(),
    );
    annotations.insert(
        "registry.value_type".to_string(),
        primary.value_type.to_string(),
    );
    if !primary.value.is_empty() {
        annotations.insert("registry.expected_value".to_string(), primary.value.clone());
    }
    if checks.len() > 1 {
        annotations.insert(
            "registry.multiple_checks".to_string(),
            checks.len().to_string(),
        );
    }

    let policy = Policy {
        api_version: API_VERSION.to_string(),
        kind: KIND_POLICY.to_string(),
        metadata: PolicyMeta {
            name,
            labels,
            annotations,
        },
        spec: PolicySpec {
            name: format!("STIG {}: {}", rule.group_id, rule.rule_title),
            query,
            description: build_description(rule, checks),
            resolution: build_resolution(rule),
            platform: PLATFORM_WINDOWS.to_string(),
            critical,
        },
    };

    validate(&policy)?;
    Ok(policy)
}

/// Compose the policy description from rule prose and check details
fn build_description(rule: &StigRule, checks: &[RegistryCheck]) -> String {
    let mut desc = String::new();

    desc.push_str(&format!(
        "STIG Rule {} (Severity: {})\n\n",
        rule.group_id, rule.rule_severity
    ));

    if !rule.rule_vuln_discussion.is_empty() {
        desc.push_str("Vulnerability Discussion:\n");
        desc.push_str(&format_text_block(&rule.rule_vuln_discussion));
        desc.push_str("\n\n");
    }

    desc.push_str("Check Content:\n");
    desc.push_str(&format_text_block(&rule.rule_check_content));
    desc.push_str("\n\n");

    if checks.len() == 1 {
        desc.push_str("Registry Check Details:\n");
        describe_check(&mut desc, &checks[0], "");
    } else {
        desc.push_str(&format!("Registry Checks ({} total):\n", checks.len()));
        for (i, check) in checks.iter().enumerate() {
            desc.push_str(&format!("Check {}:\n", i + 1));
            describe_check(&mut desc, check, "  ");
            desc.push('\n');
        }
    }

    if !rule.rule_ident.is_empty() {
        desc.push_str(&format!("\nCCI: {}\n", rule.rule_ident));
    }

    if !rule.rule_mitigations.is_empty() {
        desc.push_str("\nMitigations:\n");
        desc.push_str(&format_text_block(&rule.rule_mitigations));
    }

    desc
}

fn describe_check(desc: &mut String, check: &RegistryCheck, indent: &str) {
    desc.push_str(&format!("{}- Hive: {}\n", indent, check.hive));
    desc.push_str(&format!("{}- Path: \\{}\\\n", indent, check.path));
    desc.push_str(&format!("{}- Value Name: {}\n", indent, check.value_name));
    desc.push_str(&format!("{}- Value Type: {}\n", indent, check.value_type));
    if !check.value.is_empty() {
        desc.push_str(&format!("{}- Expected Value: {}\n", indent, check.value));
    }
    if check.comparison != Comparison::Equals {
        desc.push_str(&format!("{}- Comparison: {}\n", indent, check.comparison));
    }
}

/// Build remediation instructions from the rule's fix text
fn build_resolution(rule: &StigRule) -> String {
    if rule.rule_fix_text.is_empty() {
        return "Refer to STIG documentation for remediation steps.".to_string();
    }
    format_text_block(&rule.rule_fix_text)
}

/// Collapse whitespace runs and break sentences onto their own lines
fn format_text_block(text: &str) -> String {
    let collapsed = WHITESPACE_RUNS.replace_all(text.trim(), " ");
    collapsed.replace(". ", ".\n")
}

/// Sanitize a policy name to `[a-z0-9-]+` with collapsed, trimmed
/// hyphens, capped at 253 characters; never returns an empty string
pub fn sanitize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = INVALID_NAME_CHARS.replace_all(&lowered, "-");
    let collapsed = HYPHEN_RUNS.replace_all(&replaced, "-");
    let mut sanitized = collapsed.trim_matches('-').to_string();

    if sanitized.is_empty() {
        sanitized = "stig-policy".to_string();
    }
    if sanitized.len() > MAX_NAME_LEN {
        sanitized.truncate(MAX_NAME_LEN);
        sanitized = sanitized.trim_end_matches('-').to_string();
    }

    sanitized
}

/// Structural and SQL-shape validation for a policy document
///
/// The substring denylist is defense in depth against a synthesizer bug,
/// not a trust boundary: every input originates from a version-controlled
/// benchmark file, not from untrusted users.
pub fn validate(policy: &Policy) -> Result<(), PolicyError> {
    if policy.api_version.is_empty() {
        return Err(PolicyError::MissingField("apiVersion"));
    }
    if policy.kind.is_empty() {
        return Err(PolicyError::MissingField("kind"));
    }
    if policy.metadata.name.is_empty() {
        return Err(PolicyError::MissingField("metadata.name"));
    }
    if policy.spec.name.is_empty() {
        return Err(PolicyError::MissingField("spec.name"));
    }
    if policy.spec.query.is_empty() {
        return Err(PolicyError::MissingField("spec.query"));
    }

    if !NAME_FORMAT.is_match(&policy.metadata.name) {
        return Err(PolicyError::InvalidName(policy.metadata.name.clone()));
    }

    validate_query_shape(&policy.spec.query)
}

fn validate_query_shape(query: &str) -> Result<(), PolicyError> {
    let query = query.trim().to_lowercase();

    if !query.starts_with("select") {
        return Err(PolicyError::QueryNotSelect);
    }
    if !query.contains("from registry") {
        return Err(PolicyError::QueryMissingRegistryTable);
    }
    if !query.contains("where") {
        return Err(PolicyError::QueryMissingWhere);
    }

    const DENYLIST: [&str; 9] = [
        "--", "/*", "*/", "xp_", "sp_", "drop", "delete", "update", "insert",
    ];
    for pattern in DENYLIST {
        if query.contains(pattern) {
            return Err(PolicyError::DangerousPattern(pattern.to_string()));
        }
    }

    // A semicolon is permitted only as the final character
    if let Some(pos) = query.find(';') {
        if pos != query.len() - 1 {
            return Err(PolicyError::DangerousPattern("; (not at end)".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Hive, ValueType};

    fn sample_rule() -> StigRule {
        serde_json::from_value(serde_json::json!({
            "groupId": "V-253380",
            "ruleId": "SV-253380r958478_rule",
            "ruleVersion": "WN11-SO-000030",
            "ruleTitle": "Credential Guard must be running on Windows 11 domain-joined systems.",
            "ruleSeverity": "high",
            "ruleVulnDiscussion": "Credential Guard uses virtualization-based security.",
            "ruleCheckContent": "Registry Hive: HKEY_LOCAL_MACHINE\nRegistry Path: \\SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard\\\nValue Name: LsaCfgFlags\nValue Type: REG_DWORD\nValue: 0x00000001 (1)",
            "ruleFixText": "Enable Credential Guard via Group Policy.",
            "ruleIdent": "CCI-000366"
        }))
        .unwrap()
    }

    fn sample_check() -> RegistryCheck {
        RegistryCheck {
            hive: Hive::LocalMachine,
            path: "SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard".to_string(),
            value_name: "LsaCfgFlags".to_string(),
            value_type: ValueType::Dword,
            value: "1".to_string(),
            comparison: Comparison::Equals,
        }
    }

    #[test]
    fn test_assemble_end_to_end() {
        let policy = assemble(&sample_rule(), &[sample_check()]).unwrap();

        assert_eq!(policy.api_version, "v1");
        assert_eq!(policy.kind, "policy");
        assert_eq!(policy.metadata.name, "stig-v-253380-wn11-so-000030");
        assert!(policy.spec.critical);
        assert_eq!(policy.spec.platform, "windows");
        assert_eq!(
            policy.spec.query,
            "SELECT 1 FROM registry WHERE (path = 'HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard\\LsaCfgFlags' AND data = '1');"
        );
        assert_eq!(policy.metadata.labels["stig.severity"], "high");
        assert_eq!(policy.metadata.annotations["registry.value_name"], "LsaCfgFlags");
    }

    #[test]
    fn test_assemble_rejects_empty_checks() {
        assert_eq!(assemble(&sample_rule(), &[]), Err(PolicyError::NoChecks));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("stig-V-253380-WN11-SO-000030"), "stig-v-253380-wn11-so-000030");
        assert_eq!(sanitize_name("a__b..c"), "a-b-c");
        assert_eq!(sanitize_name("---"), "stig-policy");
        assert_eq!(sanitize_name(""), "stig-policy");
    }

    #[test]
    fn test_sanitize_name_caps_length() {
        let long = "a".repeat(300);
        let sanitized = sanitize_name(&long);
        assert!(sanitized.len() <= 253);
        assert!(!sanitized.ends_with('-'));
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let mut policy = assemble(&sample_rule(), &[sample_check()]).unwrap();
        policy.metadata.name = "Bad_Name".to_string();
        assert!(matches!(validate(&policy), Err(PolicyError::InvalidName(_))));
    }

    #[test]
    fn test_validate_rejects_dangerous_query() {
        let mut policy = assemble(&sample_rule(), &[sample_check()]).unwrap();
        policy.spec.query =
            "SELECT 1 FROM registry WHERE path = 'x'; DROP TABLE registry;".to_string();
        assert!(matches!(
            validate(&policy),
            Err(PolicyError::DangerousPattern(_))
        ));
    }

    #[test]
    fn test_validate_requires_registry_table() {
        let mut policy = assemble(&sample_rule(), &[sample_check()]).unwrap();
        policy.spec.query = "SELECT 1 WHERE 1 = 1;".to_string();
        assert_eq!(
            validate(&policy),
            Err(PolicyError::QueryMissingRegistryTable)
        );
    }

    #[test]
    fn test_yaml_round_trip_preserves_policy() {
        let policy = assemble(&sample_rule(), &[sample_check()]).unwrap();
        let yaml = serde_yaml::to_string(&policy).unwrap();
        let parsed: Policy = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, policy);
        assert!(validate(&parsed).is_ok());
    }

    #[test]
    fn test_description_contains_registry_details() {
        let policy = assemble(&sample_rule(), &[sample_check()]).unwrap();
        assert!(policy.spec.description.contains("Registry Check Details:"));
        assert!(policy.spec.description.contains("- Value Name: LsaCfgFlags"));
        assert!(policy.spec.description.contains("CCI: CCI-000366"));
    }

    #[test]
    fn test_resolution_fallback() {
        let mut rule = sample_rule();
        rule.rule_fix_text = String::new();
        let policy = assemble(&rule, &[sample_check()]).unwrap();
        assert!(policy.spec.resolution.contains("Refer to STIG documentation"));
    }
}
