//! Unified browsing schema
//!
//! Reshapes a STIG benchmark into a category-bucketed document suitable
//! for browsing UIs: one `BenchmarkData` with metadata and the eight
//! Windows 11 rule categories, each rule carrying its full text, its
//! automation status, the synthesized query, and an optional linked
//! remediation file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::benchmark::StigBenchmark;
use crate::error::{Error, Result};
use crate::registry::{extract_checks, synthesize_query, RegistryCheck};

/// Category prefixes in display order, with their names
const CATEGORY_ORDER: [(&str, &str); 8] = [
    ("WN11-00", "General Requirements"),
    ("WN11-AC", "Account Policies"),
    ("WN11-AU", "Audit Policy"),
    ("WN11-CC", "Computer Configuration"),
    ("WN11-PK", "Public Key Policies"),
    ("WN11-RG", "Registry"),
    ("WN11-SO", "Security Options"),
    ("WN11-UR", "User Rights Assignment"),
];

const DEFAULT_CATEGORY: &str = "WN11-00";

/// Top-level browsing document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkData {
    pub meta: Meta,
    pub categories: Vec<Category>,
}

/// Benchmark provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub framework: String,
    pub title: String,
    pub version: String,
    pub generated_at: String,
}

/// An ordered group of related rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub rules: Vec<Rule>,
}

/// A single benchmark rule in browsing form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Group identifier, e.g. `V-253380`
    pub id: String,
    /// STIG rule version, e.g. `WN11-SO-000030`
    pub rule_id: String,
    /// Display title: `<ruleVersion> - <ruleTitle>`
    pub title: String,
    pub severity: String,
    pub description: String,
    pub check_content: String,
    pub fix_text: String,
    pub automatable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_checks: Vec<RegistryCheck>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cci: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub weight: String,
    pub tags: Vec<String>,
}

/// A remediation payload linked to a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fix {
    pub filename: String,
    /// `xml` or `ps1`
    #[serde(rename = "type")]
    pub fix_type: FixType,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixType {
    Xml,
    Ps1,
}

/// Builds the browsing document from a benchmark and an optional
/// directory of fix files
pub struct Combiner {
    input: PathBuf,
    fix_dir: Option<PathBuf>,
}

impl Combiner {
    pub fn new(input: PathBuf, fix_dir: Option<PathBuf>) -> Self {
        Self { input, fix_dir }
    }

    /// Read all sources and produce the unified document
    pub fn combine(&self) -> Result<BenchmarkData> {
        let benchmark = self.load_benchmark()?;
        debug!(rules = benchmark.groups.len(), "read benchmark for combining");

        let fixes = match &self.fix_dir {
            Some(dir) => load_fixes(dir)?,
            None => BTreeMap::new(),
        };
        debug!(fixes = fixes.len(), "loaded fix files");

        Ok(build(&benchmark, &fixes))
    }

    fn load_benchmark(&self) -> Result<StigBenchmark> {
        let data = fs::read_to_string(&self.input).map_err(|e| Error::InputRead {
            path: self.input.clone(),
            source: e,
        })?;
        serde_json::from_str(&data).map_err(|e| Error::InputParse {
            path: self.input.clone(),
            source: e,
        })
    }
}

/// Build the browsing document from an already parsed benchmark
pub fn build(benchmark: &StigBenchmark, fixes: &BTreeMap<String, Fix>) -> BenchmarkData {
    let fix_index: BTreeMap<String, &Fix> = fixes
        .values()
        .map(|f| (normalize_title(stem(&f.filename)), f))
        .collect();

    let mut matched = 0usize;
    let rules: Vec<Rule> = benchmark
        .groups
        .iter()
        .map(|group| {
            let checks = extract_checks(&group.rule_check_content);
            let automatable = !checks.is_empty();
            let query = if automatable {
                synthesize_query(&checks)
            } else {
                String::new()
            };

            let fix = fix_index
                .get(&normalize_title(&group.rule_title))
                .map(|f| (*f).clone());
            if fix.is_some() {
                matched += 1;
            }

            let severity = group.rule_severity.as_str().to_string();
            Rule {
                id: group.group_id.clone(),
                rule_id: group.rule_version.clone(),
                title: format!("{} - {}", group.rule_version, group.rule_title),
                severity: severity.clone(),
                description: group.rule_vuln_discussion.clone(),
                check_content: group.rule_check_content.clone(),
                fix_text: group.rule_fix_text.clone(),
                automatable,
                query,
                fix,
                registry_checks: checks,
                cci: group.rule_ident.clone(),
                weight: group.rule_weight.clone(),
                tags: vec!["STIG".to_string(), "Windows11".to_string(), severity],
            }
        })
        .collect();

    debug!(matched, total = rules.len(), "linked fix files to rules");

    BenchmarkData {
        meta: Meta {
            framework: "STIG".to_string(),
            title: benchmark.title.clone(),
            version: benchmark.version.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
        categories: categorize(rules),
    }
}

/// Bucket rules into the fixed category order by rule-id prefix
///
/// Unknown prefixes fall back to General Requirements; empty categories
/// are omitted from the output.
fn categorize(rules: Vec<Rule>) -> Vec<Category> {
    let mut buckets: BTreeMap<&'static str, Vec<Rule>> = BTreeMap::new();

    for rule in rules {
        let prefix = rule
            .rule_id
            .get(..7)
            .and_then(|p| {
                CATEGORY_ORDER
                    .iter()
                    .find(|(id, _)| *id == p)
                    .map(|(id, _)| *id)
            })
            .unwrap_or(DEFAULT_CATEGORY);
        buckets.entry(prefix).or_default().push(rule);
    }

    CATEGORY_ORDER
        .iter()
        .filter_map(|(id, name)| {
            let rules = buckets.remove(id)?;
            Some(Category {
                id: id.to_string(),
                name: name.to_string(),
                rules,
            })
        })
        .collect()
}

/// Load `.xml` and `.ps1` remediation files from a directory, keyed by
/// filename
pub fn load_fixes(dir: &std::path::Path) -> Result<BTreeMap<String, Fix>> {
    let mut fixes = BTreeMap::new();

    let entries = fs::read_dir(dir).map_err(|e| Error::DirRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let fix_type = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => FixType::Xml,
            Some(ext) if ext.eq_ignore_ascii_case("ps1") => FixType::Ps1,
            _ => continue,
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read fix file");
                continue;
            }
        };

        fixes.insert(
            filename.to_string(),
            Fix {
                filename: filename.to_string(),
                fix_type,
                content,
            },
        );
    }

    Ok(fixes)
}

/// Normalize a title for fuzzy matching: strip a `STIG - ` prefix,
/// lowercase, drop `. , ' "` punctuation
pub fn normalize_title(title: &str) -> String {
    title
        .strip_prefix("STIG - ")
        .unwrap_or(title)
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '\'' | '"'))
        .collect()
}

fn stem(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(s, _)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{Severity, StigRule};

    fn rule(version: &str, title: &str, check: &str) -> StigRule {
        StigRule {
            group_id: "V-253380".to_string(),
            rule_id: "SV-253380r958478_rule".to_string(),
            rule_version: version.to_string(),
            rule_title: title.to_string(),
            rule_severity: Severity::Medium,
            rule_check_content: check.to_string(),
            rule_ident: "CCI-000366".to_string(),
            ..Default::default()
        }
    }

    fn benchmark(rules: Vec<StigRule>) -> StigBenchmark {
        StigBenchmark {
            benchmark_id: String::new(),
            title: "Windows 11 STIG".to_string(),
            version: "2".to_string(),
            groups: rules,
        }
    }

    const REGISTRY_CHECK: &str = "Registry Hive: HKEY_LOCAL_MACHINE\nRegistry Path: \\SOFTWARE\\Test\\\nValue Name: Setting\nValue Type: REG_DWORD\nValue: 1";

    #[test]
    fn test_build_marks_automatable_rules() {
        let data = build(
            &benchmark(vec![
                rule("WN11-SO-000030", "Registry rule.", REGISTRY_CHECK),
                rule("WN11-SO-000031", "Manual rule.", "Review with the administrator."),
            ]),
            &BTreeMap::new(),
        );

        assert_eq!(data.meta.framework, "STIG");
        assert_eq!(data.categories.len(), 1);
        let rules = &data.categories[0].rules;
        assert!(rules[0].automatable);
        assert!(rules[0].query.starts_with("SELECT 1 FROM registry WHERE"));
        assert_eq!(rules[0].registry_checks.len(), 1);
        assert!(!rules[1].automatable);
        assert!(rules[1].query.is_empty());
    }

    #[test]
    fn test_rule_title_and_tags() {
        let data = build(
            &benchmark(vec![rule("WN11-AU-000005", "Audit rule.", "manual")]),
            &BTreeMap::new(),
        );
        let r = &data.categories[0].rules[0];
        assert_eq!(r.title, "WN11-AU-000005 - Audit rule.");
        assert_eq!(r.tags, vec!["STIG", "Windows11", "medium"]);
        assert_eq!(r.cci, "CCI-000366");
    }

    #[test]
    fn test_categorize_order_and_default_bucket() {
        let data = build(
            &benchmark(vec![
                rule("WN11-UR-000005", "User rights.", "manual"),
                rule("WN11-AC-000005", "Account.", "manual"),
                rule("WN11-XX-000005", "Unknown prefix.", "manual"),
                rule("short", "Short id.", "manual"),
            ]),
            &BTreeMap::new(),
        );

        let ids: Vec<&str> = data.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["WN11-00", "WN11-AC", "WN11-UR"]);
        // Unknown and short rule ids land in General Requirements
        assert_eq!(data.categories[0].rules.len(), 2);
    }

    #[test]
    fn test_fix_matching_by_normalized_title() {
        let mut fixes = BTreeMap::new();
        fixes.insert(
            "Camera access must be disabled.xml".to_string(),
            Fix {
                filename: "Camera access must be disabled.xml".to_string(),
                fix_type: FixType::Xml,
                content: "<policy/>".to_string(),
            },
        );

        let data = build(
            &benchmark(vec![
                rule("WN11-CC-000005", "Camera access must be disabled.", "manual"),
                rule("WN11-CC-000010", "Unrelated rule.", "manual"),
            ]),
            &fixes,
        );

        let rules = &data.categories[0].rules;
        let fix = rules[0].fix.as_ref().expect("fix should be linked");
        assert_eq!(fix.fix_type, FixType::Xml);
        assert!(rules[1].fix.is_none());
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("STIG - Camera access must be disabled."),
            "camera access must be disabled"
        );
        assert_eq!(normalize_title("It's \"quoted\", right."), "its quoted right");
    }

    #[test]
    fn test_load_fixes_skips_unknown_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.xml"), "<x/>").unwrap();
        fs::write(tmp.path().join("b.ps1"), "Set-Thing").unwrap();
        fs::write(tmp.path().join("c.txt"), "notes").unwrap();

        let fixes = load_fixes(tmp.path()).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes["a.xml"].fix_type, FixType::Xml);
        assert_eq!(fixes["b.ps1"].fix_type, FixType::Ps1);
    }
}
