//! Registry-check extraction from STIG check text
//!
//! STIG check instructions are free-form English, but registry checks
//! within them follow a loose template:
//!
//! ```text
//! Registry Hive: HKEY_LOCAL_MACHINE
//! Registry Path: \SOFTWARE\Policies\Microsoft\Windows\DeviceGuard\
//! Value Name: LsaCfgFlags
//! Value Type: REG_DWORD
//! Value: 0x00000001 (1)
//! ```
//!
//! Extraction is anchored pattern matching, not natural-language parsing:
//! the text is segmented into one section per `Registry Hive:` marker,
//! and each section either yields a complete [`RegistryCheck`] or is
//! discarded. A rule whose sections all fail extraction simply falls
//! through to manual review; nothing here is a hard error.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::types::{Comparison, Hive, RegistryCheck, ValueType};

static HIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Registry Hive:\s*(HKEY_[A-Z_]+)").expect("valid regex"));
static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Registry Path:\s*\\?(.+?)\\?\s*(?:\n|$)").expect("valid regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Value Name:\s*(.+?)\s*(?:\n|$)").expect("valid regex"));
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:Value Type|Type):\s*(REG_[A-Z_]+)").expect("valid regex"));
static VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Value:\s*(.+?)\s*(?:\n|$)").expect("valid regex"));
// Hex value with a parenthesized decimal form, e.g. "0x00000001 (1)"
static HEX_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]+\s*\((\d+)\)").expect("valid regex"));

/// Split check text into one section per `Registry Hive:` marker
///
/// Returns an ordered list of byte ranges; each runs from its marker to
/// the next marker (or end of text). An empty list means the text
/// contains no registry check at all. Sections never overlap.
pub fn segment(check_content: &str) -> Vec<Range<usize>> {
    let starts: Vec<usize> = HIVE_RE.find_iter(check_content).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(check_content.len());
            start..end
        })
        .collect()
}

/// Extract every registry check present in one rule's check text
///
/// Sections missing a mandatory field or carrying an unrecognized hive
/// or value-type token are discarded with a trace, degrading the rule
/// toward manual review if no section survives.
pub fn extract_checks(check_content: &str) -> Vec<RegistryCheck> {
    segment(check_content)
        .into_iter()
        .filter_map(|range| extract_section(&check_content[range]))
        .collect()
}

/// Extract a single registry check from one section of check text
fn extract_section(section: &str) -> Option<RegistryCheck> {
    let hive_token = HIVE_RE.captures(section)?.get(1)?.as_str();
    let Some(hive) = Hive::parse(hive_token) else {
        debug!(hive = hive_token, "discarding section: unrecognized registry hive");
        return None;
    };

    let Some(path_match) = PATH_RE.captures(section).and_then(|c| c.get(1)) else {
        debug!(hive = %hive, "discarding section: no registry path found");
        return None;
    };
    let path = normalize_path(path_match.as_str());
    if path.is_empty() {
        debug!(hive = %hive, "discarding section: empty registry path");
        return None;
    }

    let Some(name_match) = NAME_RE.captures(section).and_then(|c| c.get(1)) else {
        debug!(hive = %hive, "discarding section: no value name found");
        return None;
    };
    let value_name = name_match.as_str().trim().to_string();
    if value_name.is_empty() {
        debug!(hive = %hive, "discarding section: empty value name");
        return None;
    }

    let value_type = match TYPE_RE.captures(section).and_then(|c| c.get(1)) {
        Some(m) => {
            let Some(vt) = ValueType::parse(m.as_str()) else {
                debug!(value_type = m.as_str(), "discarding section: unrecognized value type");
                return None;
            };
            vt
        }
        None => ValueType::default(),
    };

    let value = VALUE_RE
        .captures(section)
        .and_then(|c| c.get(1))
        .map(|m| clean_value(m.as_str()))
        .unwrap_or_default();

    let comparison = classify_comparison(section);

    let check = RegistryCheck {
        hive,
        path,
        value_name,
        value_type,
        value,
        comparison,
    };
    debug!(
        path = %check.full_path(),
        value = %check.value,
        comparison = %check.comparison,
        "extracted registry check"
    );
    Some(check)
}

/// Normalize an extracted registry path
///
/// Collapses doubled backslashes and strips leading/trailing separators;
/// the anchored pattern already trimmed surrounding whitespace.
fn normalize_path(raw: &str) -> String {
    let path = raw.trim().replace("\\\\", "\\");
    path.trim_matches('\\').to_string()
}

/// Determine the comparison semantics for a section
///
/// First-match priority: magnitude qualifiers ("or greater", "or less")
/// outrank existence qualifiers even when both phrasings appear, because
/// they are the more specific signal in STIG prose. The order here is
/// load-bearing for parity on ambiguous inputs.
pub fn classify_comparison(section: &str) -> Comparison {
    let lower = section.to_lowercase();

    if lower.contains("or greater") || section.contains(">=") {
        return Comparison::GreaterEqual;
    }
    if lower.contains("or fewer") || lower.contains("or less") || section.contains("<=") {
        return Comparison::LessEqual;
    }
    if lower.contains("must not exist") || lower.contains("should not exist") {
        return Comparison::NotExists;
    }
    // "must exist" phrasing also shows up inside "if the value does not
    // exist, this is a finding" boilerplate; that wording is not an
    // existence assertion.
    if (lower.contains("must exist") || lower.contains("should exist"))
        && !lower.contains("does not exist")
    {
        return Comparison::MustExist;
    }

    Comparison::Equals
}

/// Clean and normalize a raw expected-value string
///
/// Handles the common DISA spellings: `0x00000001 (1)` prefers the
/// parenthesized decimal, a bare hex prefix is stripped, parenthetical
/// annotations are dropped, and "N or greater"/"N or less" phrases are
/// truncated to the numeric bound.
pub fn clean_value(raw: &str) -> String {
    let mut value = raw.trim().to_string();

    if let Some(caps) = HEX_PAREN_RE.captures(&value) {
        return caps[1].to_string();
    }

    if let Some(stripped) = value.strip_prefix("0x") {
        value = stripped.to_string();
    }

    if let Some(paren) = value.find('(') {
        let before = value[..paren].trim();
        if !before.is_empty() {
            value = before.to_string();
        }
    }

    let lower = value.to_lowercase();
    if lower.contains("or greater") || lower.contains("or less") {
        if let Some(first) = value.split_whitespace().next() {
            value = first.to_string();
        }
    }

    value.trim().to_string()
}
