//! DISA STIG benchmark input model
//!
//! Deserializes the STIG benchmark JSON distributed by DISA: a benchmark
//! header plus one group per rule, each carrying the free-text check
//! instructions and fix text this crate mines for registry checks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A parsed STIG benchmark document
///
/// The input JSON carries more bookkeeping fields than listed here;
/// unknown fields are ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct StigBenchmark {
    /// Benchmark identifier from DISA (e.g., "Windows_11_STIG")
    #[serde(default, rename = "benchmarkId")]
    pub benchmark_id: String,

    /// Human-readable benchmark title
    #[serde(default)]
    pub title: String,

    /// Benchmark version string (e.g., "2")
    #[serde(default)]
    pub version: String,

    /// One group per rule
    #[serde(default)]
    pub groups: Vec<StigRule>,
}

/// A single STIG rule (one "group" in the DISA JSON)
///
/// Immutable once parsed; the pipeline only reads from it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StigRule {
    /// Group identifier (e.g., "V-253380")
    #[serde(default)]
    pub group_id: String,

    /// Versioned rule identifier (e.g., "SV-253380r991589_rule")
    #[serde(default)]
    pub rule_id: String,

    /// Rule weight from the benchmark
    #[serde(default)]
    pub rule_weight: String,

    /// Rule severity: low, medium, or high
    #[serde(default)]
    pub rule_severity: Severity,

    /// STIG rule version (e.g., "WN11-00-000001")
    #[serde(default)]
    pub rule_version: String,

    /// Rule title
    #[serde(default)]
    pub rule_title: String,

    /// Free-text vulnerability discussion
    #[serde(default)]
    pub rule_vuln_discussion: String,

    /// Rule mitigations text
    #[serde(default)]
    pub rule_mitigations: String,

    /// Compliance cross-reference identifier (e.g., "CCI-000366")
    #[serde(default)]
    pub rule_ident: String,

    /// Free-text fix/remediation instructions
    #[serde(default)]
    pub rule_fix_text: String,

    /// Fix identifier
    #[serde(default)]
    pub rule_fix_id: String,

    /// Check system identifier
    #[serde(default)]
    pub rule_check_system: String,

    /// Free-text check instructions (the extraction target)
    #[serde(default)]
    pub rule_check_content: String,
}

/// Rule severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Low severity (CAT III)
    Low,
    /// Medium severity (CAT II, the default)
    #[default]
    Medium,
    /// High severity (CAT I)
    High,
    /// Anything the benchmark uses that we do not recognize
    Unknown,
}

impl Severity {
    /// Parse a severity string case-insensitively
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    /// Lowercase string form used in labels and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }

    /// STIG CAT level for display
    pub fn to_cat(&self) -> &'static str {
        match self {
            Self::High => "CAT I",
            Self::Medium => "CAT II",
            Self::Low => "CAT III",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Benchmarks are not consistent about severity casing, so deserialize
// through the case-insensitive parser instead of a derived enum.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_level(&s))
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_level() {
        assert_eq!(Severity::from_level("high"), Severity::High);
        assert_eq!(Severity::from_level("HIGH"), Severity::High);
        assert_eq!(Severity::from_level(" medium "), Severity::Medium);
        assert_eq!(Severity::from_level("low"), Severity::Low);
        assert_eq!(Severity::from_level("critical"), Severity::Unknown);
    }

    #[test]
    fn test_severity_cat_levels() {
        assert_eq!(Severity::High.to_cat(), "CAT I");
        assert_eq!(Severity::Medium.to_cat(), "CAT II");
        assert_eq!(Severity::Low.to_cat(), "CAT III");
    }

    #[test]
    fn test_parse_benchmark_json() {
        let json = r#"{
            "benchmarkId": "Windows_11_STIG",
            "title": "Microsoft Windows 11 Security Technical Implementation Guide",
            "version": "2",
            "groups": [
                {
                    "groupId": "V-253380",
                    "ruleId": "SV-253380r958478_rule",
                    "ruleSeverity": "High",
                    "ruleVersion": "WN11-SO-000030",
                    "ruleTitle": "Credential Guard must be running.",
                    "ruleCheckContent": "Registry Hive: HKEY_LOCAL_MACHINE\n"
                }
            ]
        }"#;

        let benchmark: StigBenchmark = serde_json::from_str(json).unwrap();
        assert_eq!(benchmark.version, "2");
        assert_eq!(benchmark.groups.len(), 1);

        let rule = &benchmark.groups[0];
        assert_eq!(rule.group_id, "V-253380");
        assert_eq!(rule.rule_severity, Severity::High);
        assert_eq!(rule.rule_version, "WN11-SO-000030");
        // Fields absent from the JSON default to empty
        assert!(rule.rule_fix_text.is_empty());
    }
}
