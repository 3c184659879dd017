//! Windows registry check extraction and SQL synthesis
//!
//! The algorithmic core of the crate: mining zero or more discrete
//! registry assertions out of a STIG rule's free-text check
//! instructions and compiling them into one osquery SQL statement.
//!
//! The pipeline runs in four stages, all pure:
//!
//! 1. [`extract::segment`] splits check text into sections, one per
//!    `Registry Hive:` marker.
//! 2. [`extract::extract_checks`] pulls hive, path, value name, value
//!    type, and expected value out of each section and classifies the
//!    comparison semantics from the surrounding prose.
//! 3. [`validate::validate_checks`] reports path-traversal and blank
//!    value-name violations.
//! 4. [`sql::synthesize_query`] compiles the surviving checks into a
//!    single conjunctive `SELECT` against the `registry` table.
//!
//! Extraction is deterministic and best-effort: when the template does
//! not match, the section is discarded and the rule falls back to
//! manual review.

pub mod extract;
pub mod sql;
pub mod types;
pub mod validate;

pub use extract::{classify_comparison, clean_value, extract_checks, segment};
pub use sql::synthesize_query;
pub use types::{Comparison, Hive, RegistryCheck, ValueType};
pub use validate::{validate_checks, ValidationError};
