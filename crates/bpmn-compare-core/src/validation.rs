/// Validation of single BPMN documents, reported through a sink.
///
/// A validator pushes [`ValidationEvent`]s into a [`ValidationSink`] at one
/// of three severities. [`ValidationCollector`] is the standard sink: it
/// counts events per severity and keeps the formatted messages.
///
/// [`StructureValidator`] is the built-in validator. It checks the structure
/// every interchange file needs before a comparison makes sense; full XSD
/// validation plugs in behind the same [`XmlValidator`] trait.
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::document::{BPMN_MODEL_NS, Document, Element, parse_document};

/// Severity of a validation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but acceptable.
    Warning,
    /// The document violates the model.
    Error,
    /// The document could not be processed any further.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("Warning"),
            Self::Error | Self::Fatal => f.write_str("Error"),
        }
    }
}

/// One validation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationEvent {
    /// 1-based line.
    pub line: u32,
    /// 1-based column, 0 when only the line is known.
    pub column: u32,
    /// What is wrong.
    pub message: String,
}

impl ValidationEvent {
    /// Creates an event at `line` with no column information.
    pub fn at_line(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column: 0,
            message: message.into(),
        }
    }
}

/// Receives validation events.
pub trait ValidationSink {
    /// Something suspicious that does not invalidate the document.
    fn warning(&mut self, event: ValidationEvent);
    /// A violation; the document is invalid.
    fn error(&mut self, event: ValidationEvent);
    /// A violation after which validation cannot continue.
    fn fatal_error(&mut self, event: ValidationEvent);
}

/// Event counts for one validated document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    /// Number of warnings.
    pub warnings: usize,
    /// Number of errors.
    pub errors: usize,
    /// Number of fatal errors.
    pub fatal_errors: usize,
}

impl ValidationSummary {
    /// `true` when there are no errors and no fatal errors.
    pub fn is_valid(&self) -> bool {
        self.errors == 0 && self.fatal_errors == 0
    }
}

/// Sink that counts events and keeps their formatted messages.
#[derive(Debug, Clone, Default)]
pub struct ValidationCollector {
    summary: ValidationSummary,
    messages: Vec<String>,
}

impl ValidationCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts so far.
    pub fn summary(&self) -> ValidationSummary {
        self.summary
    }

    /// Messages in arrival order, e.g. `Error Line 3: duplicate id 'T1'`.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// `true` when no error or fatal error was received.
    pub fn is_valid(&self) -> bool {
        self.summary.is_valid()
    }

    fn push(&mut self, severity: Severity, event: &ValidationEvent) {
        tracing::debug!(%severity, line = event.line, message = %event.message, "validation event");
        self.messages
            .push(format!("{severity} Line {}: {}", event.line, event.message));
    }
}

impl ValidationSink for ValidationCollector {
    fn warning(&mut self, event: ValidationEvent) {
        self.summary.warnings += 1;
        self.push(Severity::Warning, &event);
    }

    fn error(&mut self, event: ValidationEvent) {
        self.summary.errors += 1;
        self.push(Severity::Error, &event);
    }

    fn fatal_error(&mut self, event: ValidationEvent) {
        self.summary.fatal_errors += 1;
        self.push(Severity::Fatal, &event);
    }
}

/// A validator for one XML document.
pub trait XmlValidator {
    /// Validates `xml`, reporting every problem to `sink`.
    fn validate(&self, xml: &str, sink: &mut dyn ValidationSink);
}

// ---------------------------------------------------------------------------
// StructureValidator
// ---------------------------------------------------------------------------

/// Built-in structural checks for BPMN 2.0 interchange files.
///
/// - not well-formed XML: fatal;
/// - root is not `definitions` in the BPMN model namespace: error;
/// - `definitions` without `targetNamespace`: error;
/// - an `id` value used twice: error;
/// - `sourceRef`/`targetRef` attributes naming no element: warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureValidator;

impl XmlValidator for StructureValidator {
    fn validate(&self, xml: &str, sink: &mut dyn ValidationSink) {
        match parse_document(xml) {
            Ok(doc) => check_document(&doc, sink),
            Err(e) => sink.fatal_error(ValidationEvent {
                line: e.line,
                column: e.column,
                message: e.message,
            }),
        }
    }
}

fn check_document(doc: &Document, sink: &mut dyn ValidationSink) {
    let root = &doc.root;
    let is_definitions = root.name.local == "definitions"
        && root.name.namespace.as_deref() == Some(BPMN_MODEL_NS);
    if is_definitions {
        if root.attribute("targetNamespace").is_none() {
            sink.error(ValidationEvent::at_line(
                root.line,
                "definitions has no targetNamespace attribute",
            ));
        }
    } else {
        sink.error(ValidationEvent::at_line(
            root.line,
            format!(
                "root element is <{}>, expected <definitions> in namespace {BPMN_MODEL_NS}",
                root.name.qualified()
            ),
        ));
    }

    let mut ids: HashMap<&str, u32> = HashMap::new();
    root.walk(&mut |element| {
        let Some(id) = element.attribute("id") else {
            return;
        };
        match ids.get(id).copied() {
            Some(first) => sink.error(ValidationEvent::at_line(
                element.line,
                format!("duplicate id '{id}' (first defined on line {first})"),
            )),
            None => {
                ids.insert(id, element.line);
            }
        }
    });

    let known: HashSet<&str> = ids.keys().copied().collect();
    root.walk(&mut |element| check_refs(element, &known, sink));
}

fn check_refs(element: &Element, known: &HashSet<&str>, sink: &mut dyn ValidationSink) {
    for attr in ["sourceRef", "targetRef"] {
        let Some(value) = element.attribute(attr) else {
            continue;
        };
        let local = value.rsplit_once(':').map_or(value, |(_, local)| local);
        if !known.contains(local) {
            sink.warning(ValidationEvent::at_line(
                element.line,
                format!(
                    "{attr} '{value}' of <{}> does not name any element",
                    element.name.local
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(xml: &str) -> ValidationCollector {
        let mut collector = ValidationCollector::new();
        StructureValidator.validate(xml, &mut collector);
        collector
    }

    const HEAD: &str = r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" targetNamespace="urn:t" id="D">"#;

    #[test]
    fn valid_document_has_no_events() {
        let xml = format!(
            r#"{HEAD}<process id="P"><startEvent id="S"/><task id="T"/><sequenceFlow id="F" sourceRef="S" targetRef="T"/></process></definitions>"#
        );
        let c = run(&xml);
        assert_eq!(c.summary(), ValidationSummary::default());
        assert!(c.is_valid());
        assert!(c.messages().is_empty());
    }

    #[test]
    fn malformed_xml_is_fatal() {
        let c = run("<definitions>\n<process></definitions>");
        assert_eq!(c.summary().fatal_errors, 1);
        assert!(!c.is_valid());
        assert!(c.messages()[0].starts_with("Error Line 2: "));
    }

    #[test]
    fn wrong_root_is_an_error() {
        let c = run(r#"<definitions targetNamespace="urn:t"/>"#);
        assert_eq!(c.summary().errors, 1);
        assert!(c.messages()[0].contains("expected <definitions>"));
    }

    #[test]
    fn missing_target_namespace_is_an_error() {
        let c = run(r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL"/>"#);
        assert_eq!(c.summary().errors, 1);
        assert_eq!(
            c.messages()[0],
            "Error Line 1: definitions has no targetNamespace attribute"
        );
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let xml = format!("{HEAD}\n<process id=\"P\">\n<task id=\"T\"/>\n<task id=\"T\"/>\n</process></definitions>");
        let c = run(&xml);
        assert_eq!(c.summary().errors, 1);
        assert_eq!(
            c.messages()[0],
            "Error Line 4: duplicate id 'T' (first defined on line 3)"
        );
    }

    #[test]
    fn dangling_flow_references_are_warnings() {
        let xml = format!(
            r#"{HEAD}<process id="P"><task id="T"/><sequenceFlow id="F" sourceRef="T" targetRef="Nowhere"/></process><collaboration id="C"><messageFlow id="M" sourceRef="tns:T" targetRef="P"/></collaboration></definitions>"#
        );
        let c = run(&xml);
        assert_eq!(c.summary().warnings, 1);
        assert!(c.is_valid());
        assert!(c.messages()[0].starts_with("Warning Line 1: targetRef 'Nowhere'"));
    }
}
