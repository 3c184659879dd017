//! # stigquery
//!
//! Converts DISA STIG benchmarks for Microsoft Windows 11 into
//! osquery-based compliance policies in the Fleet policy format.
//!
//! The pipeline parses a STIG benchmark JSON export, mines Windows
//! registry assertions out of each rule's free-text check instructions,
//! compiles them into osquery SQL against the `registry` table, and
//! wraps each query in a validated policy document ready for Fleet.
//! Rules whose checks cannot be expressed as registry reads are counted
//! for manual review instead.
//!
//! ## Quick Start
//!
//! ```ignore
//! use stigquery::processor::{Processor, ProcessingOptions};
//!
//! let options = ProcessingOptions {
//!     input: "windows-11-stig.json".into(),
//!     output_dir: "policies".into(),
//!     ..Default::default()
//! };
//! let result = Processor::new(options).run()?;
//! println!(
//!     "{} automatable, {} manual review",
//!     result.automatable, result.manual_review
//! );
//! # Ok::<(), stigquery::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`benchmark`]: STIG benchmark input types
//! - [`registry`]: registry check extraction, validation, SQL synthesis
//! - [`policy`]: policy envelope assembly and validation
//! - [`processor`]: the batch pipeline, statistics, output validation
//! - [`summary`]: the run summary document
//! - [`schema`]: the unified browsing schema

pub mod benchmark;
pub mod error;
pub mod policy;
pub mod processor;
pub mod registry;
pub mod schema;
pub mod summary;

// Re-exports
pub use benchmark::{Severity, StigBenchmark, StigRule};
pub use error::{Error, Result};
pub use policy::{Policy, PolicyError};
pub use processor::{
    OutputFormat, ProcessingOptions, ProcessingResult, Processor,
};
pub use registry::{extract_checks, synthesize_query, validate_checks, RegistryCheck};
pub use summary::ProcessingSummary;
