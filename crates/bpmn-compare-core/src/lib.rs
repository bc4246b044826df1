#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod compare;
pub mod config;
pub mod document;
pub mod engine;
pub mod filter;
pub mod matching;
pub mod pairing;
pub mod registry;
pub mod report;
pub mod types;
pub mod validation;

pub use compare::{CompareError, compare, compare_documents};
pub use config::{
    ConfigError, DefaultValue, ElementPattern, EquivalenceClass, EquivalenceConfig, IgnoreRule,
    MessageTemplate, Normalization, TEXT_ATTRIBUTE,
};
pub use document::{Document, Element, ParseError, QName, XmlAttribute, parse_document};
pub use engine::diff;
pub use filter::{LOW_CONFIDENCE_SUFFIX, filter};
pub use matching::{MatchMap, MatchedPair, NodeRef, Unmatched, match_documents};
pub use pairing::{UnknownVariant, Variant, candidate_file_name, is_bpmn_file};
pub use registry::{RegistryError, ToolEntry, ToolRegistry};
pub use report::{
    DetailedOutput, Link, MISSING_TEST_FILE, Output, TestReport, TestResults, ToolReport,
    describe_difference, describe_parse_error, describe_unreadable,
};
pub use types::{
    Comparison, Confidence, Detail, DifferenceKind, NodeDetail, RawDifference, Side,
    SignificantDifference,
};
pub use validation::{
    Severity, StructureValidator, ValidationCollector, ValidationEvent, ValidationSink,
    ValidationSummary, XmlValidator,
};

/// Returns the current version of the bpmn-compare-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
