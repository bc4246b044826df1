/// One-shot comparison of a reference and a candidate document.
use thiserror::Error;

use crate::config::EquivalenceConfig;
use crate::document::{Document, ParseError, parse_document};
use crate::engine::diff;
use crate::filter::filter;
use crate::matching::match_documents;
use crate::types::{Comparison, Side};

/// A comparison could not run because one input is not well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    /// The reference document failed to parse.
    #[error("reference document is not well-formed XML ({0})")]
    ReferenceParse(#[source] ParseError),
    /// The candidate document failed to parse.
    #[error("candidate document is not well-formed XML ({0})")]
    CandidateParse(#[source] ParseError),
}

impl CompareError {
    /// Which input failed.
    pub fn side(&self) -> Side {
        match self {
            Self::ReferenceParse(_) => Side::Reference,
            Self::CandidateParse(_) => Side::Candidate,
        }
    }

    /// The underlying parse error.
    pub fn parse_error(&self) -> &ParseError {
        match self {
            Self::ReferenceParse(e) | Self::CandidateParse(e) => e,
        }
    }
}

/// Parses both documents and compares them.
///
/// # Errors
///
/// Returns [`CompareError`] naming the side that is not well-formed. The
/// reference is parsed first.
pub fn compare(
    reference: &str,
    candidate: &str,
    config: &EquivalenceConfig,
) -> Result<Comparison, CompareError> {
    let reference = parse_document(reference).map_err(CompareError::ReferenceParse)?;
    let candidate = parse_document(candidate).map_err(CompareError::CandidateParse)?;
    Ok(compare_documents(&reference, &candidate, config))
}

/// Compares two parsed documents: match, diff, filter.
pub fn compare_documents(
    reference: &Document,
    candidate: &Document,
    config: &EquivalenceConfig,
) -> Comparison {
    let map = match_documents(reference, candidate, config);
    let raw = diff(&map);
    let raw_count = raw.len();
    let differences = filter(raw, config);
    tracing::debug!(
        raw = raw_count,
        significant = differences.len(),
        "comparison finished"
    );
    Comparison {
        differences,
        warnings: map.warnings,
        raw_count,
    }
}
