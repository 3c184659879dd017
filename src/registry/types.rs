//! Core types for Windows registry checks
//!
//! The hive, value-type, and comparison vocabularies are closed: they are
//! modeled as enums and unrecognized tokens are rejected during
//! extraction, so arbitrary strings never reach SQL synthesis.

use serde::{Deserialize, Serialize};

/// Top-level Windows registry namespace root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hive {
    #[serde(rename = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[serde(rename = "HKEY_CURRENT_USER")]
    CurrentUser,
    #[serde(rename = "HKEY_USERS")]
    Users,
    #[serde(rename = "HKEY_CLASSES_ROOT")]
    ClassesRoot,
    #[serde(rename = "HKEY_CURRENT_CONFIG")]
    CurrentConfig,
}

impl Hive {
    /// Parse a hive token such as `HKEY_LOCAL_MACHINE`
    ///
    /// Returns `None` for anything outside the five recognized hives.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "HKEY_LOCAL_MACHINE" => Some(Self::LocalMachine),
            "HKEY_CURRENT_USER" => Some(Self::CurrentUser),
            "HKEY_USERS" => Some(Self::Users),
            "HKEY_CLASSES_ROOT" => Some(Self::ClassesRoot),
            "HKEY_CURRENT_CONFIG" => Some(Self::CurrentConfig),
            _ => None,
        }
    }

    /// Canonical registry spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::Users => "HKEY_USERS",
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }
}

impl std::fmt::Display for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Windows registry value type
///
/// STIG check text sometimes omits the type line; DWORD is the default
/// because it is by far the most common type in the benchmark prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "REG_SZ")]
    Sz,
    #[serde(rename = "REG_EXPAND_SZ")]
    ExpandSz,
    #[serde(rename = "REG_BINARY")]
    Binary,
    #[default]
    #[serde(rename = "REG_DWORD")]
    Dword,
    #[serde(rename = "REG_QWORD")]
    Qword,
    #[serde(rename = "REG_MULTI_SZ")]
    MultiSz,
}

impl ValueType {
    /// Parse a value-type token such as `REG_DWORD`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "REG_SZ" => Some(Self::Sz),
            "REG_EXPAND_SZ" => Some(Self::ExpandSz),
            "REG_BINARY" => Some(Self::Binary),
            "REG_DWORD" => Some(Self::Dword),
            "REG_QWORD" => Some(Self::Qword),
            "REG_MULTI_SZ" => Some(Self::MultiSz),
            _ => None,
        }
    }

    /// Canonical registry spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sz => "REG_SZ",
            Self::ExpandSz => "REG_EXPAND_SZ",
            Self::Binary => "REG_BINARY",
            Self::Dword => "REG_DWORD",
            Self::Qword => "REG_QWORD",
            Self::MultiSz => "REG_MULTI_SZ",
        }
    }

    /// Whether this type holds a single string
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Sz | Self::ExpandSz)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison semantics inferred from the check prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Exact match against the expected value (the default)
    #[default]
    Equals,
    /// Value must be greater than or equal to the bound
    GreaterEqual,
    /// Value must be less than or equal to the bound
    LessEqual,
    /// The registry value must not exist
    NotExists,
    /// The registry value must exist, regardless of its data
    MustExist,
}

impl Comparison {
    /// Lowercase identifier used in labels and the browsing schema
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::GreaterEqual => "greater_equal",
            Self::LessEqual => "less_equal",
            Self::NotExists => "not_exists",
            Self::MustExist => "must_exist",
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One discrete Windows registry assertion extracted from check text
///
/// Hive, path, and value name are always non-empty in a constructed
/// instance; sections missing any of them are discarded during
/// extraction and never materialize as a `RegistryCheck`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCheck {
    /// Registry hive
    pub hive: Hive,

    /// Backslash-segmented key path, no leading or trailing separator
    pub path: String,

    /// Registry value name
    pub value_name: String,

    /// Registry value type
    pub value_type: ValueType,

    /// Normalized expected value; empty means no specific value asserted
    #[serde(rename = "expectedValue", default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    /// Comparison semantics
    pub comparison: Comparison,
}

impl RegistryCheck {
    /// Fully qualified key path used in synthesized queries:
    /// `hive\path\valueName`
    pub fn full_path(&self) -> String {
        format!("{}\\{}\\{}", self.hive.as_str(), self.path, self.value_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hive_parse() {
        assert_eq!(Hive::parse("HKEY_LOCAL_MACHINE"), Some(Hive::LocalMachine));
        assert_eq!(Hive::parse(" HKEY_CURRENT_USER "), Some(Hive::CurrentUser));
        assert_eq!(Hive::parse("HKEY_DYN_DATA"), None);
        assert_eq!(Hive::parse("hkey_local_machine"), None);
    }

    #[test]
    fn test_value_type_parse_and_default() {
        assert_eq!(ValueType::parse("REG_SZ"), Some(ValueType::Sz));
        assert_eq!(ValueType::parse("REG_NONE"), None);
        assert_eq!(ValueType::default(), ValueType::Dword);
        assert!(ValueType::ExpandSz.is_string());
        assert!(!ValueType::MultiSz.is_string());
    }

    #[test]
    fn test_full_path() {
        let check = RegistryCheck {
            hive: Hive::LocalMachine,
            path: "SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard".to_string(),
            value_name: "LsaCfgFlags".to_string(),
            value_type: ValueType::Dword,
            value: "1".to_string(),
            comparison: Comparison::Equals,
        };
        assert_eq!(
            check.full_path(),
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DeviceGuard\\LsaCfgFlags"
        );
    }

    #[test]
    fn test_comparison_serde_form() {
        let json = serde_json::to_string(&Comparison::GreaterEqual).unwrap();
        assert_eq!(json, "\"greater_equal\"");
    }
}
