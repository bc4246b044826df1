/// Equivalence configuration: the declarative rules that decide which XML
/// differences are noise.
///
/// The configuration is a JSON document (see [`EquivalenceConfig::from_json`])
/// holding ignore rules, value-equivalence classes, documented attribute
/// defaults, value normalisations, numeric attributes, message templates and
/// per-element matching keys. It is parsed and validated once per run and is
/// immutable afterwards; every stage of the engine receives it by shared
/// reference.
///
/// Element paths are written over local names, e.g. `/definitions/process/task`.
/// Pattern syntax:
///
/// - `/a/b` matches exactly the element `b` under root `a`;
/// - `//b` matches an element `b` at any depth;
/// - `*` matches any single element name.
///
/// Attribute names are prefix-independent: a bare name such as `isExecutable`
/// addresses the un-namespaced attribute only, and a namespaced attribute is
/// written `{namespace-uri}local`.
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pseudo-attribute name addressing the direct text content of a leaf element.
pub const TEXT_ATTRIBUTE: &str = "#text";

/// Attribute used as matching key when an element type has no explicit entry.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "id";

const BUILTIN_CONFIG: &str = include_str!("default_config.json");

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A configuration document could not be loaded.
///
/// Every variant is fatal: no comparison may start with a configuration that
/// failed to load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// An element path pattern could not be compiled.
    #[error("invalid element path pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An equivalence class lists no spellings.
    #[error("equivalence class {canonical:?} has no spellings")]
    EmptyEquivalenceClass {
        /// Canonical value of the offending class.
        canonical: String,
    },

    /// One spelling maps to two different canonical values for the same attribute.
    #[error("spelling {spelling:?} belongs to both {first:?} and {second:?}")]
    ConflictingSpelling {
        /// The ambiguous literal.
        spelling: String,
        /// Canonical value of the first class.
        first: String,
        /// Canonical value of the second class.
        second: String,
    },

    /// A default-value entry names no attribute.
    #[error("default value entry {index} has an empty attribute name")]
    EmptyDefaultAttribute {
        /// Zero-based index in the `defaults` array.
        index: usize,
    },
}

// ---------------------------------------------------------------------------
// ElementPattern
// ---------------------------------------------------------------------------

/// A compiled XPath-like element path pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementPattern {
    source: String,
    exact: Regex,
    subtree: Regex,
}

impl ElementPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern is not absolute,
    /// has an empty trailing step, or contains a step that is neither `*` nor
    /// an XML local name.
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };

        let mut body = String::new();
        let mut any_depth = false;
        let mut steps = 0usize;
        for segment in rest.split('/') {
            if segment.is_empty() {
                if any_depth {
                    return Err(invalid("empty step"));
                }
                any_depth = true;
                continue;
            }
            let step = if segment == "*" {
                "[^/]+".to_owned()
            } else if is_local_name(segment) {
                regex::escape(segment)
            } else {
                return Err(invalid(&format!("invalid step {segment:?}")));
            };
            if any_depth {
                body.push_str("(?:/[^/]+)*");
            }
            body.push('/');
            body.push_str(&step);
            any_depth = false;
            steps += 1;
        }
        if any_depth || steps == 0 {
            return Err(invalid("must end with an element step"));
        }

        let compile = |re: String| Regex::new(&re).map_err(|e| invalid(&e.to_string()));
        Ok(Self {
            source: pattern.to_owned(),
            exact: compile(format!("^{body}$"))?,
            subtree: compile(format!("^{body}(?:/.*)?$"))?,
        })
    }

    /// Returns `true` if `path` names exactly an element this pattern selects.
    pub fn matches(&self, path: &str) -> bool {
        self.exact.is_match(path)
    }

    /// Returns `true` if `path` is a selected element or lies anywhere below one.
    pub fn covers(&self, path: &str) -> bool {
        self.subtree.is_match(path)
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for ElementPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ElementPattern> for String {
    fn from(value: ElementPattern) -> Self {
        value.source
    }
}

impl fmt::Display for ElementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_local_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        Some(_) | None => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

// ---------------------------------------------------------------------------
// Rule types
// ---------------------------------------------------------------------------

/// A difference location that conformant tools may legitimately disagree on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreRule {
    /// Elements the rule applies to.
    pub element_path: ElementPattern,
    /// Attribute name; `None` ignores the element and its whole subtree.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Why the difference is irrelevant.
    pub reason: String,
}

impl IgnoreRule {
    /// Returns `true` if a node difference at `path` is covered.
    pub fn covers_element(&self, path: &str) -> bool {
        self.attribute.is_none() && self.element_path.covers(path)
    }

    /// Returns `true` if a difference on `attribute` of the element at `path`
    /// is covered. Text differences use [`TEXT_ATTRIBUTE`].
    pub fn covers_attribute(&self, path: &str, attribute: &str) -> bool {
        match &self.attribute {
            None => self.element_path.covers(path),
            Some(name) => name == attribute && self.element_path.matches(path),
        }
    }
}

/// A set of literal spellings that all mean `canonical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquivalenceClass {
    /// The canonical value.
    pub canonical: String,
    /// Accepted spellings (the canonical value is implicitly included).
    pub spellings: Vec<String>,
    /// Attribute names the class is scoped to; empty means every attribute.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl EquivalenceClass {
    fn applies_to(&self, attribute: &str) -> bool {
        self.attributes.is_empty() || self.attributes.iter().any(|a| a == attribute)
    }

    fn scopes_overlap(&self, other: &Self) -> bool {
        self.attributes.is_empty()
            || other.attributes.is_empty()
            || self.attributes.iter().any(|a| other.attributes.contains(a))
    }
}

/// The value an attribute takes when it is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultValue {
    /// Element local names; empty means every element.
    #[serde(default)]
    pub elements: Vec<String>,
    /// Attribute local name.
    pub attribute: String,
    /// Documented default value.
    pub value: String,
}

/// Lexical normalisation applied to values before they are compared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Normalization {
    /// Attribute names (or [`TEXT_ATTRIBUTE`]); empty means every value.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Strip leading and trailing whitespace.
    #[serde(default)]
    pub trim: bool,
    /// Replace every run of whitespace with a single space.
    #[serde(default)]
    pub collapse_whitespace: bool,
    /// Compare case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
}

impl Normalization {
    fn applies_to(&self, attribute: &str) -> bool {
        self.attributes.is_empty() || self.attributes.iter().any(|a| a == attribute)
    }

    fn apply(&self, value: &str) -> String {
        let out = if self.collapse_whitespace {
            value.split_whitespace().collect::<Vec<_>>().join(" ")
        } else if self.trim {
            value.trim().to_owned()
        } else {
            value.to_owned()
        };
        if self.ignore_case {
            out.to_lowercase()
        } else {
            out
        }
    }
}

/// A custom description for significant differences at a location.
///
/// Placeholders: `{kind}`, `{element}`, `{attribute}`, `{reference}`,
/// `{candidate}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageTemplate {
    /// Elements the template applies to (the element itself, not its subtree).
    pub element_path: ElementPattern,
    /// Restricts the template to one attribute when set.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Template text.
    pub template: String,
}

// ---------------------------------------------------------------------------
// EquivalenceConfig
// ---------------------------------------------------------------------------

/// The complete, validated set of equivalence rules for one run.
///
/// Construct with [`EquivalenceConfig::from_json`] or
/// [`EquivalenceConfig::builtin`]. [`EquivalenceConfig::default`] has no rules
/// at all: every literal difference is significant and elements are keyed by
/// `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquivalenceConfig {
    /// Ignore rules, checked in order.
    #[serde(default)]
    pub ignore: Vec<IgnoreRule>,
    /// Value-equivalence classes.
    #[serde(default)]
    pub equivalence_classes: Vec<EquivalenceClass>,
    /// Documented defaults for omitted attributes.
    #[serde(default)]
    pub defaults: Vec<DefaultValue>,
    /// Normalisations, applied in order.
    #[serde(default)]
    pub normalizations: Vec<Normalization>,
    /// Attributes whose values compare numerically.
    #[serde(default)]
    pub numeric_attributes: Vec<String>,
    /// Description templates, first match wins.
    #[serde(default)]
    pub messages: Vec<MessageTemplate>,
    /// Matching-key attribute per element local name. An empty string forces
    /// positional matching for that element type.
    #[serde(default)]
    pub matching_keys: BTreeMap<String, String>,
}

impl EquivalenceConfig {
    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the JSON is malformed, a pattern does not
    /// compile, or the equivalence classes contradict each other.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the configuration shipped with the crate.
    ///
    /// It ignores diagram interchange, vendor extension elements and exporter
    /// metadata, accepts `1`/`0` for boolean attributes, knows the BPMN 2.0
    /// attribute defaults and trims leaf text.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded document is broken, which the crate's tests
    /// rule out.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_CONFIG)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for class in &self.equivalence_classes {
            if class.spellings.is_empty() {
                return Err(ConfigError::EmptyEquivalenceClass {
                    canonical: class.canonical.clone(),
                });
            }
        }
        for (i, a) in self.equivalence_classes.iter().enumerate() {
            for b in &self.equivalence_classes[i + 1..] {
                if a.canonical == b.canonical || !a.scopes_overlap(b) {
                    continue;
                }
                let a_all: HashSet<&str> = a
                    .spellings
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(a.canonical.as_str()))
                    .collect();
                let clash = b
                    .spellings
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(b.canonical.as_str()))
                    .find(|s| a_all.contains(s));
                if let Some(spelling) = clash {
                    return Err(ConfigError::ConflictingSpelling {
                        spelling: spelling.to_owned(),
                        first: a.canonical.clone(),
                        second: b.canonical.clone(),
                    });
                }
            }
        }
        for (index, default) in self.defaults.iter().enumerate() {
            if default.attribute.is_empty() {
                return Err(ConfigError::EmptyDefaultAttribute { index });
            }
        }
        Ok(())
    }

    /// Returns the matching-key attribute for elements named `element`, or
    /// `None` when the element type is matched by position only.
    pub fn key_attribute(&self, element: &str) -> Option<&str> {
        match self.matching_keys.get(element) {
            Some(key) if key.is_empty() => None,
            Some(key) => Some(key.as_str()),
            None => Some(DEFAULT_KEY_ATTRIBUTE),
        }
    }

    /// Returns the first ignore rule covering a node difference at `path`.
    pub fn ignore_rule_for_element(&self, path: &str) -> Option<&IgnoreRule> {
        self.ignore.iter().find(|r| r.covers_element(path))
    }

    /// Returns the first ignore rule covering `attribute` of the element at `path`.
    pub fn ignore_rule_for_attribute(&self, path: &str, attribute: &str) -> Option<&IgnoreRule> {
        self.ignore
            .iter()
            .find(|r| r.covers_attribute(path, attribute))
    }

    /// Returns the documented default of `attribute` on `element`, if any.
    pub fn default_for(&self, element: &str, attribute: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|d| {
                d.attribute == attribute
                    && (d.elements.is_empty() || d.elements.iter().any(|e| e == element))
            })
            .map(|d| d.value.as_str())
    }

    /// Maps `value` of `attribute` to its canonical form.
    ///
    /// Normalisations run first, then numeric canonicalisation for numeric
    /// attributes, then equivalence-class lookup.
    pub fn canonical_value(&self, attribute: &str, value: &str) -> String {
        let normalized = self.normalize(attribute, value);

        if self.numeric_attributes.iter().any(|a| a == attribute)
            && let Ok(n) = normalized.parse::<f64>()
            && n.is_finite()
        {
            return format!("{n}");
        }

        for class in &self.equivalence_classes {
            if !class.applies_to(attribute) {
                continue;
            }
            let hit = std::iter::once(&class.canonical)
                .chain(class.spellings.iter())
                .any(|s| self.normalize(attribute, s) == normalized);
            if hit {
                return class.canonical.clone();
            }
        }
        normalized
    }

    /// Decides whether two attribute (or text) values are interchangeable.
    ///
    /// `None` means the attribute is absent on that side; it is equivalent to
    /// the documented default for `(element, attribute)`.
    pub fn values_equivalent(
        &self,
        element: &str,
        attribute: &str,
        reference: Option<&str>,
        candidate: Option<&str>,
    ) -> bool {
        match (reference, candidate) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                self.canonical_value(attribute, a) == self.canonical_value(attribute, b)
            }
            (Some(present), None) | (None, Some(present)) => {
                self.default_for(element, attribute).is_some_and(|default| {
                    self.canonical_value(attribute, default)
                        == self.canonical_value(attribute, present)
                })
            }
        }
    }

    /// Returns the first message template for `attribute` on the element at `path`.
    ///
    /// Node-level differences pass `None` and only match templates without an
    /// attribute restriction.
    pub fn message_for(&self, path: &str, attribute: Option<&str>) -> Option<&MessageTemplate> {
        self.messages.iter().find(|m| {
            m.element_path.matches(path)
                && match (&m.attribute, attribute) {
                    (None, _) => true,
                    (Some(want), Some(got)) => want == got,
                    (Some(_), None) => false,
                }
        })
    }

    fn normalize(&self, attribute: &str, value: &str) -> String {
        self.normalizations
            .iter()
            .filter(|n| n.applies_to(attribute))
            .fold(value.to_owned(), |acc, n| n.apply(&acc))
    }
}
