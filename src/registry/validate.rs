//! Validation of extracted registry checks
//!
//! Hive, value-type, and comparison vocabularies are enforced by the
//! enums in [`types`](super::types), so the checks here cover what the
//! type system cannot: path traversal sequences and blank value names.
//! Violations are reported, not thrown; the policy-level validation in
//! [`policy`](crate::policy) remains the authoritative gate before
//! anything is persisted.

use serde::Serialize;

use super::types::RegistryCheck;

/// A non-fatal validation finding for one registry check
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// One-based index of the offending check within the rule
    pub check_index: usize,
    /// Human-readable description of the violation
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "check {}: {}", self.check_index, self.message)
    }
}

/// Validate a rule's extracted registry checks before synthesis
///
/// Returns one error record per violation; an empty list means all
/// checks are safe to hand to the SQL synthesizer.
pub fn validate_checks(checks: &[RegistryCheck]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (i, check) in checks.iter().enumerate() {
        let index = i + 1;

        if check.path.contains("..") {
            errors.push(ValidationError {
                check_index: index,
                message: "registry path contains invalid '..' sequence".to_string(),
            });
        }

        if check.value_name.trim().is_empty() {
            errors.push(ValidationError {
                check_index: index,
                message: "registry value name cannot be empty".to_string(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::{Comparison, Hive, ValueType};

    fn check_with_path(path: &str) -> RegistryCheck {
        RegistryCheck {
            hive: Hive::LocalMachine,
            path: path.to_string(),
            value_name: "TestValue".to_string(),
            value_type: ValueType::Dword,
            value: "1".to_string(),
            comparison: Comparison::Equals,
        }
    }

    #[test]
    fn test_valid_checks_pass() {
        let checks = vec![check_with_path("SOFTWARE\\Policies\\Test")];
        assert!(validate_checks(&checks).is_empty());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let checks = vec![check_with_path("SOFTWARE\\..\\SYSTEM")];
        let errors = validate_checks(&checks);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].check_index, 1);
        assert!(errors[0].message.contains(".."));
    }

    #[test]
    fn test_blank_value_name_rejected() {
        let mut check = check_with_path("SOFTWARE\\Test");
        check.value_name = "   ".to_string();
        let errors = validate_checks(&[check]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("value name"));
    }

    #[test]
    fn test_errors_indexed_per_check() {
        let good = check_with_path("SOFTWARE\\Good");
        let bad = check_with_path("SOFTWARE\\..\\Bad");
        let errors = validate_checks(&[good, bad]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].check_index, 2);
    }
}
