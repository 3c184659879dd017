//! Run summary document
//!
//! A single file written next to the generated policies recording the
//! aggregate counts and one line per emitted policy.

use serde::{Deserialize, Serialize};

use crate::policy::Policy;
use crate::processor::{ProcessingError, ProcessingResult};

/// Aggregate summary of a processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// Rules considered (after severity filtering)
    pub total_rules: usize,
    /// Rules with at least one validated registry check
    pub automatable: usize,
    /// Rules requiring manual review
    pub manual_review: usize,
    /// Policies that survived validation and were emitted
    pub policies_generated: usize,
    /// Wall-clock processing time, humanized
    pub processing_time: String,
    /// RFC 3339 generation timestamp
    pub timestamp: String,
    /// One entry per emitted policy, sorted by name
    pub policies: Vec<PolicySummaryItem>,
    /// Non-fatal errors recorded during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProcessingError>,
}

/// One emitted policy's summary line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummaryItem {
    pub name: String,
    pub title: String,
    pub platform: String,
    pub critical: bool,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub rule_version: String,
}

impl ProcessingSummary {
    /// Build a summary from a finished processing result
    ///
    /// Policy entries are sorted by name for stable output.
    pub fn from_result(result: &ProcessingResult) -> Self {
        let mut policies: Vec<PolicySummaryItem> =
            result.policies.iter().map(PolicySummaryItem::from_policy).collect();
        policies.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            total_rules: result.total,
            automatable: result.automatable,
            manual_review: result.manual_review,
            policies_generated: result.policies.len(),
            processing_time: format!("{:?}", result.duration),
            timestamp: chrono::Utc::now().to_rfc3339(),
            policies,
            errors: result.errors.clone(),
        }
    }
}

impl PolicySummaryItem {
    fn from_policy(policy: &Policy) -> Self {
        let label = |key: &str| {
            policy
                .metadata
                .labels
                .get(key)
                .cloned()
                .unwrap_or_default()
        };

        Self {
            name: policy.metadata.name.clone(),
            title: policy.spec.name.clone(),
            platform: policy.spec.platform.clone(),
            critical: policy.spec.critical,
            severity: label("stig.severity"),
            group_id: label("stig.group_id"),
            rule_version: label("stig.rule_version"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::policy::{PolicyMeta, PolicySpec};

    fn policy_named(name: &str) -> Policy {
        let mut labels = std::collections::BTreeMap::new();
        labels.insert("stig.severity".to_string(), "high".to_string());
        labels.insert("stig.group_id".to_string(), "V-1".to_string());
        labels.insert("stig.rule_version".to_string(), "WN11-00-000001".to_string());
        Policy {
            api_version: "v1".to_string(),
            kind: "policy".to_string(),
            metadata: PolicyMeta {
                name: name.to_string(),
                labels,
                ..Default::default()
            },
            spec: PolicySpec {
                name: format!("STIG: {name}"),
                query: "SELECT 1 FROM registry WHERE path = 'x';".to_string(),
                platform: "windows".to_string(),
                critical: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_summary_sorted_by_name() {
        let result = ProcessingResult {
            total: 2,
            automatable: 2,
            manual_review: 0,
            policies: vec![policy_named("stig-b"), policy_named("stig-a")],
            errors: Vec::new(),
            duration: Duration::from_millis(10),
        };

        let summary = ProcessingSummary::from_result(&result);
        assert_eq!(summary.policies_generated, 2);
        assert_eq!(summary.policies[0].name, "stig-a");
        assert_eq!(summary.policies[1].name, "stig-b");
        assert_eq!(summary.policies[0].severity, "high");
        assert_eq!(summary.policies[0].group_id, "V-1");
    }
}
