//! osquery SQL synthesis for registry checks
//!
//! Emits one `SELECT` statement per rule against osquery's virtual
//! `registry` table, conjoining one parenthesized predicate per check.
//! The predicate shape follows the check's comparison semantics and
//! value type; all inputs have already passed extraction and validation.

use super::types::{Comparison, RegistryCheck, ValueType};

/// Expected string values longer than this are checked for presence
/// rather than exact equality; DISA prose truncates or paraphrases long
/// expected strings too often for exact matching to be reliable.
const LONG_STRING_THRESHOLD: usize = 50;

/// Synthesize one osquery SQL statement covering all checks for a rule
///
/// Every emitted query is terminated by exactly one semicolon. A lone
/// `not_exists` check is emitted without `FROM registry`: its predicate
/// is itself a sub-select, so no outer table scan is needed.
pub fn synthesize_query(checks: &[RegistryCheck]) -> String {
    if checks.is_empty() {
        return String::new();
    }

    let conditions: Vec<String> = checks.iter().map(predicate).collect();

    if checks.len() == 1 && checks[0].comparison == Comparison::NotExists {
        return format!("SELECT 1 WHERE {};", conditions[0]);
    }

    format!("SELECT 1 FROM registry WHERE {};", conditions.join(" AND "))
}

/// Build the predicate for a single registry check
fn predicate(check: &RegistryCheck) -> String {
    let full_path = check.full_path();

    match check.comparison {
        Comparison::NotExists => format!(
            "NOT EXISTS (SELECT 1 FROM registry WHERE path = '{}')",
            full_path
        ),
        Comparison::MustExist => format!("path = '{}'", full_path),
        Comparison::GreaterEqual => format!(
            "(path = '{}' AND CAST(data AS INTEGER) >= {})",
            full_path, check.value
        ),
        Comparison::LessEqual => format!(
            "(path = '{}' AND CAST(data AS INTEGER) <= {})",
            full_path, check.value
        ),
        Comparison::Equals => equals_predicate(check, &full_path),
    }
}

fn equals_predicate(check: &RegistryCheck, full_path: &str) -> String {
    if check.value_type.is_string() {
        if check.value.len() > LONG_STRING_THRESHOLD {
            // Long string: presence, not exact match
            format!(
                "(path = '{}' AND data != '' AND LENGTH(data) > 0)",
                full_path
            )
        } else if !check.value.is_empty() {
            format!(
                "(path = '{}' AND data = '{}')",
                full_path,
                escape(&check.value)
            )
        } else {
            // No expected value asserted; the value just has to exist
            format!("(path = '{}' AND data IS NOT NULL)", full_path)
        }
    } else if check.value_type == ValueType::MultiSz {
        format!(
            "(path = '{}' AND data != '' AND LENGTH(data) > 0)",
            full_path
        )
    } else if is_numeric(&check.value, check.value_type) {
        // Numeric literal: emit as-is, no quote escaping needed
        format!("(path = '{}' AND data = '{}')", full_path, check.value)
    } else {
        format!(
            "(path = '{}' AND data = '{}')",
            full_path,
            escape(&check.value)
        )
    }
}

/// Whether the expected value should be treated as numeric
fn is_numeric(value: &str, value_type: ValueType) -> bool {
    if matches!(value_type, ValueType::Dword | ValueType::Qword) {
        return true;
    }
    value.parse::<i64>().is_ok()
}

/// Double single-quotes for SQL string literals
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::Hive;

    fn check(comparison: Comparison, value_type: ValueType, value: &str) -> RegistryCheck {
        RegistryCheck {
            hive: Hive::LocalMachine,
            path: "SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard".to_string(),
            value_name: "LsaCfgFlags".to_string(),
            value_type,
            value: value.to_string(),
            comparison,
        }
    }

    #[test]
    fn test_equals_dword() {
        let query = synthesize_query(&[check(Comparison::Equals, ValueType::Dword, "1")]);
        assert_eq!(
            query,
            "SELECT 1 FROM registry WHERE (path = 'HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard\\LsaCfgFlags' AND data = '1');"
        );
    }

    #[test]
    fn test_lone_not_exists_has_no_outer_table() {
        let query = synthesize_query(&[check(Comparison::NotExists, ValueType::Dword, "")]);
        assert!(query.starts_with("SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM registry WHERE"));
        assert!(!query.starts_with("SELECT 1 FROM registry"));
        assert!(query.ends_with(";"));
    }

    #[test]
    fn test_not_exists_with_sibling_keeps_outer_table() {
        let checks = vec![
            check(Comparison::NotExists, ValueType::Dword, ""),
            check(Comparison::Equals, ValueType::Dword, "1"),
        ];
        let query = synthesize_query(&checks);
        assert!(query.starts_with("SELECT 1 FROM registry WHERE"));
        assert!(query.contains(" AND "));
    }

    #[test]
    fn test_greater_equal_casts_data() {
        let query = synthesize_query(&[check(Comparison::GreaterEqual, ValueType::Dword, "14")]);
        assert!(query.contains("CAST(data AS INTEGER) >= 14"));
    }

    #[test]
    fn test_less_equal_casts_data() {
        let query = synthesize_query(&[check(Comparison::LessEqual, ValueType::Dword, "3")]);
        assert!(query.contains("CAST(data AS INTEGER) <= 3"));
    }

    #[test]
    fn test_must_exist_is_bare_path_predicate() {
        let query = synthesize_query(&[check(Comparison::MustExist, ValueType::Dword, "")]);
        assert_eq!(
            query,
            "SELECT 1 FROM registry WHERE path = 'HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard\\LsaCfgFlags';"
        );
    }

    #[test]
    fn test_long_string_becomes_presence_check() {
        let long = "a".repeat(LONG_STRING_THRESHOLD + 1);
        let query = synthesize_query(&[check(Comparison::Equals, ValueType::Sz, &long)]);
        assert!(query.contains("data != '' AND LENGTH(data) > 0"));
        assert!(!query.contains(&long));
    }

    #[test]
    fn test_short_string_escapes_quotes() {
        let query = synthesize_query(&[check(Comparison::Equals, ValueType::Sz, "O'Brien")]);
        assert!(query.contains("data = 'O''Brien'"));
    }

    #[test]
    fn test_empty_string_value_checks_existence() {
        let query = synthesize_query(&[check(Comparison::Equals, ValueType::Sz, "")]);
        assert!(query.contains("data IS NOT NULL"));
    }

    #[test]
    fn test_multi_sz_checks_presence() {
        let query = synthesize_query(&[check(Comparison::Equals, ValueType::MultiSz, "anything")]);
        assert!(query.contains("data != '' AND LENGTH(data) > 0"));
    }

    #[test]
    fn test_single_trailing_semicolon_every_branch() {
        for comparison in [
            Comparison::Equals,
            Comparison::GreaterEqual,
            Comparison::LessEqual,
            Comparison::NotExists,
            Comparison::MustExist,
        ] {
            let query = synthesize_query(&[check(comparison, ValueType::Dword, "1")]);
            assert!(query.ends_with(';'), "missing terminator: {query}");
            assert_eq!(query.matches(';').count(), 1, "extra semicolons: {query}");
        }
    }

    #[test]
    fn test_multiple_checks_conjoined() {
        let checks = vec![
            check(Comparison::Equals, ValueType::Dword, "1"),
            check(Comparison::GreaterEqual, ValueType::Dword, "2"),
        ];
        let query = synthesize_query(&checks);
        assert!(query.starts_with("SELECT 1 FROM registry WHERE ("));
        assert_eq!(query.matches(" AND ").count(), 3); // 1 join + 2 inner
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(synthesize_query(&[]), "");
    }
}
