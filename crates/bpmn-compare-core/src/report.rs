/// Aggregate result tree for a comparison run: Tool > Test > Output.
///
/// [`TestResults`] is filled concurrently while pairs are compared and
/// rendered once at the end. Rendering is deterministic: tools by name, tests
/// by file name, outputs in insertion order.
use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use quick_xml::escape::escape;
use serde::{Serialize, Serializer};

use crate::compare::CompareError;
use crate::types::{Detail, NodeDetail, Side, SignificantDifference};

/// Info text recorded when a reference file has no candidate counterpart.
pub const MISSING_TEST_FILE: &str = "Missing test file!";

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A navigation link into one of the compared documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Document the link points into.
    pub side: Side,
    /// Link label, e.g. `Show in reference`.
    pub label: String,
}

impl Link {
    /// Creates the `Show in <side>` link.
    pub fn show_in(side: Side) -> Self {
        Self {
            side,
            label: format!("Show in {side}"),
        }
    }
}

/// A finding with per-side details and navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedOutput {
    /// Human-readable description.
    pub description: String,
    /// Reference-side detail, then candidate-side detail.
    pub details: Vec<Detail>,
    /// `Show in reference`, then `Show in candidate`.
    pub links: Vec<Link>,
}

/// One entry in a test (or tool) section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Output {
    /// A significant difference or a per-pair failure.
    Finding(DetailedOutput),
    /// An informational note.
    Info(String),
}

impl Output {
    /// Returns `"finding"` or `"info"`.
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Finding(_) => "finding",
            Self::Info(_) => "info",
        }
    }
}

/// Turns a significant difference into a report finding.
pub fn describe_difference(difference: &SignificantDifference) -> DetailedOutput {
    DetailedOutput {
        description: difference.description.clone(),
        details: vec![difference.reference.clone(), difference.candidate.clone()],
        links: vec![Link::show_in(Side::Reference), Link::show_in(Side::Candidate)],
    }
}

/// Turns a parse failure into a report finding naming the failing side.
pub fn describe_parse_error(error: &CompareError) -> DetailedOutput {
    let failing = error.side();
    let parse = error.parse_error();
    let detail = |side: Side| {
        let value = (side == failing).then(|| parse.to_string());
        Detail::new(side, &NodeDetail { xpath: None, value })
    };
    DetailedOutput {
        description: error.to_string(),
        details: vec![detail(Side::Reference), detail(Side::Candidate)],
        links: vec![Link::show_in(Side::Reference), Link::show_in(Side::Candidate)],
    }
}

/// Turns an input file that could not be read into a report finding.
///
/// Used for files that are missing, too large or not UTF-8; they count as a
/// failure of the pair just like a parse error.
pub fn describe_unreadable(failing: Side, reason: &str) -> DetailedOutput {
    let detail = |side: Side| {
        let value = (side == failing).then(|| reason.to_owned());
        Detail::new(side, &NodeDetail { xpath: None, value })
    };
    DetailedOutput {
        description: format!("{failing} document could not be read"),
        details: vec![detail(Side::Reference), detail(Side::Candidate)],
        links: vec![Link::show_in(Side::Reference), Link::show_in(Side::Candidate)],
    }
}

// ---------------------------------------------------------------------------
// TestResults
// ---------------------------------------------------------------------------

/// Append-only result tree, safe to fill from many threads.
#[derive(Debug, Default)]
pub struct TestResults {
    tools: DashMap<String, Vec<Output>>,
    tests: DashMap<(String, String), Vec<Output>>,
}

/// Rendered view of one tool section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    /// Tool label.
    pub name: String,
    /// Tool-level outputs (e.g. a missing submission folder).
    pub outputs: Vec<Output>,
    /// Tests ordered by file name.
    pub tests: Vec<TestReport>,
}

/// Rendered view of one test section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestReport {
    /// Reference file name.
    pub name: String,
    /// Outputs in insertion order.
    pub outputs: Vec<Output>,
}

impl TestResults {
    /// Creates an empty result tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the tool section if it does not exist yet.
    pub fn ensure_tool(&self, tool: &str) {
        self.tools.entry(tool.to_owned()).or_default();
    }

    /// Creates an empty test section (and its tool) if it does not exist yet.
    pub fn ensure_test(&self, tool: &str, test: &str) {
        self.ensure_tool(tool);
        self.tests
            .entry((tool.to_owned(), test.to_owned()))
            .or_default();
    }

    /// Appends `output` to a test section, creating it on first use.
    pub fn record(&self, tool: &str, test: &str, output: Output) {
        self.ensure_tool(tool);
        self.tests
            .entry((tool.to_owned(), test.to_owned()))
            .or_default()
            .push(output);
    }

    /// Appends `output` to the tool section itself.
    pub fn record_tool(&self, tool: &str, output: Output) {
        self.tools.entry(tool.to_owned()).or_default().push(output);
    }

    /// Number of findings across all sections.
    pub fn finding_count(&self) -> usize {
        self.count(|o| matches!(o, Output::Finding(_)))
    }

    /// Number of info outputs across all sections.
    pub fn info_count(&self) -> usize {
        self.count(|o| matches!(o, Output::Info(_)))
    }

    fn count(&self, pred: impl Fn(&Output) -> bool) -> usize {
        let tool_level: usize = self
            .tools
            .iter()
            .map(|e| e.value().iter().filter(|o| pred(o)).count())
            .sum();
        let test_level: usize = self
            .tests
            .iter()
            .map(|e| e.value().iter().filter(|o| pred(o)).count())
            .sum();
        tool_level + test_level
    }

    /// Returns an ordered snapshot of the tree.
    pub fn snapshot(&self) -> Vec<ToolReport> {
        let mut tools: BTreeMap<String, ToolReport> = self
            .tools
            .iter()
            .map(|e| {
                let report = ToolReport {
                    name: e.key().clone(),
                    outputs: e.value().clone(),
                    tests: Vec::new(),
                };
                (e.key().clone(), report)
            })
            .collect();

        let mut tests: BTreeMap<(String, String), Vec<Output>> = BTreeMap::new();
        for entry in &self.tests {
            tests.insert(entry.key().clone(), entry.value().clone());
        }
        for ((tool, test), outputs) in tests {
            tools
                .entry(tool.clone())
                .or_insert_with(|| ToolReport {
                    name: tool,
                    outputs: Vec::new(),
                    tests: Vec::new(),
                })
                .tests
                .push(TestReport {
                    name: test,
                    outputs,
                });
        }
        tools.into_values().collect()
    }

    /// Renders the tree as XML.
    pub fn render(&self) -> String {
        XmlReport(&self.snapshot()).to_string()
    }

    /// Renders the tree as indented plain text.
    pub fn render_text(&self) -> String {
        TextReport(&self.snapshot()).to_string()
    }
}

impl Serialize for TestResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Root {
            tools: Vec<ToolReport>,
        }
        Root {
            tools: self.snapshot(),
        }
        .serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct XmlReport<'a>(&'a [ToolReport]);

impl fmt::Display for XmlReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(f, "<testResults>")?;
        for tool in self.0 {
            writeln!(f, "  <tool name=\"{}\">", escape(tool.name.as_str()))?;
            for output in &tool.outputs {
                write_output_xml(f, output, "    ")?;
            }
            for test in &tool.tests {
                writeln!(f, "    <test name=\"{}\">", escape(test.name.as_str()))?;
                for output in &test.outputs {
                    write_output_xml(f, output, "      ")?;
                }
                writeln!(f, "    </test>")?;
            }
            writeln!(f, "  </tool>")?;
        }
        writeln!(f, "</testResults>")
    }
}

fn write_output_xml(f: &mut fmt::Formatter<'_>, output: &Output, pad: &str) -> fmt::Result {
    match output {
        Output::Info(text) => writeln!(
            f,
            "{pad}<output type=\"{}\">{}</output>",
            output.type_str(),
            escape(text.as_str())
        ),
        Output::Finding(finding) => {
            writeln!(f, "{pad}<output type=\"{}\">", output.type_str())?;
            writeln!(
                f,
                "{pad}  <description>{}</description>",
                escape(finding.description.as_str())
            )?;
            for detail in &finding.details {
                writeln!(
                    f,
                    "{pad}  <detail type=\"{}\" xpath=\"{}\">{}</detail>",
                    detail.side,
                    escape(detail.xpath.as_deref().unwrap_or_default()),
                    escape(detail.message.as_str())
                )?;
            }
            for link in &finding.links {
                writeln!(
                    f,
                    "{pad}  <link type=\"{}\">{}</link>",
                    link.side,
                    escape(link.label.as_str())
                )?;
            }
            writeln!(f, "{pad}</output>")
        }
    }
}

struct TextReport<'a>(&'a [ToolReport]);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tool in self.0 {
            writeln!(f, "Tool: {}", tool.name)?;
            for output in &tool.outputs {
                write_output_text(f, output, "  ")?;
            }
            for test in &tool.tests {
                writeln!(f, "  Test: {}", test.name)?;
                if test.outputs.is_empty() {
                    writeln!(f, "    no significant differences")?;
                }
                for output in &test.outputs {
                    write_output_text(f, output, "    ")?;
                }
            }
        }
        Ok(())
    }
}

fn write_output_text(f: &mut fmt::Formatter<'_>, output: &Output, pad: &str) -> fmt::Result {
    match output {
        Output::Info(text) => writeln!(f, "{pad}[{}] {text}", output.type_str()),
        Output::Finding(finding) => {
            writeln!(f, "{pad}[{}] {}", output.type_str(), finding.description)?;
            for detail in &finding.details {
                writeln!(f, "{pad}    {}", detail.message.replace('\t', " "))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::compare::compare;
    use crate::config::EquivalenceConfig;

    fn finding(description: &str) -> Output {
        Output::Finding(DetailedOutput {
            description: description.to_owned(),
            details: vec![
                Detail::new(
                    Side::Reference,
                    &NodeDetail {
                        xpath: Some("/a[1]/@x".to_owned()),
                        value: Some("1".to_owned()),
                    },
                ),
                Detail::new(
                    Side::Candidate,
                    &NodeDetail {
                        xpath: Some("/a[1]/@x".to_owned()),
                        value: Some("<2>".to_owned()),
                    },
                ),
            ],
            links: vec![Link::show_in(Side::Reference), Link::show_in(Side::Candidate)],
        })
    }

    #[test]
    fn record_is_get_or_create() {
        let results = TestResults::new();
        results.record("Tool 1.0", "a.bpmn", finding("one"));
        results.record("Tool 1.0", "a.bpmn", finding("two"));
        results.ensure_test("Tool 1.0", "a.bpmn");
        let snapshot = results.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].tests.len(), 1);
        assert_eq!(snapshot[0].tests[0].outputs.len(), 2);
        assert_eq!(results.finding_count(), 2);
    }

    #[test]
    fn snapshot_is_ordered_by_tool_then_test() {
        let results = TestResults::new();
        results.ensure_test("Zeta", "b.bpmn");
        results.ensure_test("Alpha", "b.bpmn");
        results.ensure_test("Alpha", "a.bpmn");
        let names: Vec<(String, Vec<String>)> = results
            .snapshot()
            .into_iter()
            .map(|t| (t.name, t.tests.into_iter().map(|t| t.name).collect()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Alpha".to_owned(), vec!["a.bpmn".to_owned(), "b.bpmn".to_owned()]),
                ("Zeta".to_owned(), vec!["b.bpmn".to_owned()]),
            ]
        );
    }

    #[test]
    fn render_escapes_markup() {
        let results = TestResults::new();
        results.record("T", "a.bpmn", finding("x < y"));
        results.record("T", "b.bpmn", Output::Info(MISSING_TEST_FILE.to_owned()));
        let xml = results.render();
        assert!(xml.contains("<description>x &lt; y</description>"));
        assert!(xml.contains("<output type=\"info\">Missing test file!</output>"));
        assert!(xml.contains("<link type=\"candidate\">Show in candidate</link>"));
        assert!(xml.contains("candidate: /a[1]/@x :\t&lt;2&gt;"));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }

    #[test]
    fn render_text_lists_every_test() {
        let results = TestResults::new();
        results.ensure_test("T", "clean.bpmn");
        results.record_tool("Other 2.0", Output::Info("folder not found".to_owned()));
        let text = results.render_text();
        assert!(text.contains("Tool: T\n  Test: clean.bpmn\n    no significant differences\n"));
        assert!(text.contains("Tool: Other 2.0\n  [info] folder not found\n"));
        assert_eq!(results.info_count(), 1);
    }

    #[test]
    fn json_has_tagged_outputs() {
        let results = TestResults::new();
        results.record("T", "a.bpmn", Output::Info("note".to_owned()));
        let json = serde_json::to_value(&results).expect("serialize");
        assert_eq!(json["tools"][0]["name"], "T");
        assert_eq!(json["tools"][0]["tests"][0]["outputs"][0]["type"], "info");
        assert_eq!(json["tools"][0]["tests"][0]["outputs"][0]["content"], "note");
    }

    #[test]
    fn describe_difference_has_two_details_and_links() {
        let cmp = compare(
            r#"<p><task id="T1" name="Review"/></p>"#,
            r#"<p><task id="T1" name="Review "/></p>"#,
            &EquivalenceConfig::default(),
        )
        .expect("compare");
        let out = describe_difference(&cmp.differences[0]);
        assert_eq!(out.details.len(), 2);
        assert_eq!(out.details[0].side, Side::Reference);
        assert_eq!(out.links[0].label, "Show in reference");
        assert_eq!(out.links[1].label, "Show in candidate");
    }

    #[test]
    fn parse_error_names_failing_side() {
        let err = compare("<a/>", "<a>", &EquivalenceConfig::default()).expect_err("broken");
        let out = describe_parse_error(&err);
        assert!(out.description.starts_with("candidate document"));
        assert_eq!(out.details[0].value, None);
        assert!(out.details[1].value.is_some());
    }

    #[test]
    fn unreadable_file_names_failing_side() {
        let out = describe_unreadable(Side::Reference, "invalid UTF-8 at byte 4");
        assert_eq!(out.description, "reference document could not be read");
        assert_eq!(out.details[0].value.as_deref(), Some("invalid UTF-8 at byte 4"));
        assert_eq!(out.details[1].value, None);
    }
}
