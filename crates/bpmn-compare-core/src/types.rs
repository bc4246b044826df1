/// Difference records produced by the comparison pipeline.
use std::fmt;

use serde::Serialize;

/// The kind of a raw difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// An element of the reference has no counterpart in the candidate.
    MissingNode,
    /// An element of the candidate has no counterpart in the reference.
    ExtraNode,
    /// An attribute differs, or is present on one side only.
    AttributeValueChanged,
    /// The text content of a leaf element differs.
    TextValueChanged,
}

impl DifferenceKind {
    /// Returns the `snake_case` tag used in serialised output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingNode => "missing_node",
            Self::ExtraNode => "extra_node",
            Self::AttributeValueChanged => "attribute_value_changed",
            Self::TextValueChanged => "text_value_changed",
        }
    }
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the element pair a difference was found on got matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Matched by a unique matching-key value.
    Keyed,
    /// Matched by ordinal position among keyless siblings.
    Positional,
    /// Matched by position because matching keys were not unique.
    Ambiguous,
}

/// Location and literal value of one side of a difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDetail {
    /// XPath into that side's document; `None` when the side has no node.
    pub xpath: Option<String>,
    /// Literal value at that location; `None` when absent.
    pub value: Option<String>,
}

/// A difference reported by the difference engine, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDifference {
    /// What differs.
    pub kind: DifferenceKind,
    /// Reference side.
    pub reference: NodeDetail,
    /// Candidate side.
    pub candidate: NodeDetail,
    /// Local name of the element the difference belongs to.
    pub element: String,
    /// Local-name path of that element (`/definitions/process/task`).
    pub element_path: String,
    /// Attribute name as config rules address it (`name`, or
    /// `{namespace}name` when namespaced), or
    /// [`crate::config::TEXT_ATTRIBUTE`] for text.
    pub attribute: Option<String>,
    /// Match quality of the element pair.
    pub confidence: Confidence,
    /// Generic description.
    pub description: String,
}

impl RawDifference {
    /// Returns the last XPath step of the element this difference is about,
    /// e.g. `task[@id='T1']`.
    pub fn element_step(&self) -> &str {
        let xpath = self
            .reference
            .xpath
            .as_deref()
            .or(self.candidate.xpath.as_deref())
            .unwrap_or_default();
        let element_xpath = match self.kind {
            DifferenceKind::AttributeValueChanged | DifferenceKind::TextValueChanged => xpath
                .rsplit_once('/')
                .map_or(xpath, |(element, _)| element),
            DifferenceKind::MissingNode | DifferenceKind::ExtraNode => xpath,
        };
        element_xpath
            .rsplit_once('/')
            .map_or(element_xpath, |(_, step)| step)
    }
}

/// Which document a detail or link refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The reference document.
    Reference,
    /// The candidate (vendor) document.
    Candidate,
}

impl Side {
    /// Returns `"reference"` or `"candidate"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a significant difference, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    /// Which document this detail points into.
    pub side: Side,
    /// XPath in that document.
    pub xpath: Option<String>,
    /// Literal value.
    pub value: Option<String>,
    /// `"<side>: <xpath> :\t<value>"`.
    pub message: String,
}

impl Detail {
    /// Builds the display record for one side of a difference.
    pub fn new(side: Side, node: &NodeDetail) -> Self {
        let xpath = node.xpath.as_deref().unwrap_or("-");
        let value = node.value.as_deref().unwrap_or("-");
        Self {
            side,
            xpath: node.xpath.clone(),
            value: node.value.clone(),
            message: format!("{side}: {xpath} :\t{value}"),
        }
    }
}

/// A difference that survived the significance filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignificantDifference {
    /// The underlying raw difference.
    pub raw: RawDifference,
    /// Final human-readable description.
    pub description: String,
    /// Reference-side detail.
    pub reference: Detail,
    /// Candidate-side detail.
    pub candidate: Detail,
}

/// Result of comparing one reference/candidate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Significant differences in document order.
    pub differences: Vec<SignificantDifference>,
    /// Non-fatal matching diagnostics (duplicate keys).
    pub warnings: Vec<String>,
    /// Number of raw differences before filtering.
    pub raw_count: usize,
}

impl Comparison {
    /// Returns `true` if the documents are semantically equivalent.
    pub fn is_equivalent(&self) -> bool {
        self.differences.is_empty()
    }
}
