/// Pairing of reference files with candidate files.
///
/// For a reference file `name.bpmn` the candidate is `name-<variant>.bpmn`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// File extension of BPMN interchange files.
pub const BPMN_EXTENSION: &str = "bpmn";

/// How the candidate file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// The tool re-created the model and exported it.
    Export,
    /// The tool imported the reference and exported it again.
    Roundtrip,
}

impl Variant {
    /// Returns `"export"` or `"roundtrip"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Roundtrip => "roundtrip",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown variant name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant {0:?} (expected \"export\" or \"roundtrip\")")]
pub struct UnknownVariant(pub String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(Self::Export),
            "roundtrip" => Ok(Self::Roundtrip),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Returns `true` if `file_name` has the `.bpmn` extension.
pub fn is_bpmn_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == BPMN_EXTENSION)
}

/// Returns the candidate file name for the reference file `file_name`, or
/// `None` when it is not a BPMN file.
pub fn candidate_file_name(file_name: &str, variant: Variant) -> Option<String> {
    if !is_bpmn_file(file_name) {
        return None;
    }
    let (stem, _) = file_name.rsplit_once('.')?;
    Some(format!("{stem}-{variant}.{BPMN_EXTENSION}"))
}
