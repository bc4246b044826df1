/// Significance filter: decides which raw differences matter.
///
/// Each raw difference is checked against the [`EquivalenceConfig`] in
/// precedence order:
///
/// 1. an ignore rule covering the location drops it;
/// 2. values that canonicalise to the same thing (normalisation, equivalence
///    class, numeric value, documented default) drop it;
/// 3. everything else is significant and gets a description.
use crate::config::{EquivalenceConfig, TEXT_ATTRIBUTE};
use crate::types::{
    Confidence, Detail, DifferenceKind, RawDifference, Side, SignificantDifference,
};

/// Suffix appended to descriptions of differences found under ambiguous keys.
pub const LOW_CONFIDENCE_SUFFIX: &str = " (low confidence: ambiguous matching keys)";

/// Filters `raw` down to the significant differences, preserving order.
pub fn filter(raw: Vec<RawDifference>, config: &EquivalenceConfig) -> Vec<SignificantDifference> {
    raw.into_iter()
        .filter(|d| !is_ignored(d, config) && !is_equivalent(d, config))
        .map(|d| significant(d, config))
        .collect()
}

fn is_ignored(d: &RawDifference, config: &EquivalenceConfig) -> bool {
    let rule = match (d.kind, d.attribute.as_deref()) {
        (DifferenceKind::MissingNode | DifferenceKind::ExtraNode, _) => {
            config.ignore_rule_for_element(&d.element_path)
        }
        (DifferenceKind::AttributeValueChanged | DifferenceKind::TextValueChanged, Some(attr)) => {
            config.ignore_rule_for_attribute(&d.element_path, attr)
        }
        (DifferenceKind::AttributeValueChanged | DifferenceKind::TextValueChanged, None) => None,
    };
    match rule {
        Some(rule) => {
            tracing::debug!(
                kind = %d.kind,
                path = %d.element_path,
                attribute = d.attribute.as_deref().unwrap_or_default(),
                rule = %rule.element_path,
                reason = %rule.reason,
                "difference ignored"
            );
            true
        }
        None => false,
    }
}

fn is_equivalent(d: &RawDifference, config: &EquivalenceConfig) -> bool {
    let attribute = match (d.kind, d.attribute.as_deref()) {
        (DifferenceKind::AttributeValueChanged | DifferenceKind::TextValueChanged, Some(a)) => a,
        (DifferenceKind::MissingNode | DifferenceKind::ExtraNode, _)
        | (DifferenceKind::AttributeValueChanged | DifferenceKind::TextValueChanged, None) => {
            return false;
        }
    };

    let (reference, candidate) = if attribute == TEXT_ATTRIBUTE {
        (
            Some(d.reference.value.as_deref().unwrap_or_default()),
            Some(d.candidate.value.as_deref().unwrap_or_default()),
        )
    } else {
        (d.reference.value.as_deref(), d.candidate.value.as_deref())
    };

    let equivalent = config.values_equivalent(&d.element, attribute, reference, candidate);
    if equivalent {
        tracing::debug!(
            kind = %d.kind,
            path = %d.element_path,
            attribute,
            reference = reference.unwrap_or("-"),
            candidate = candidate.unwrap_or("-"),
            "difference is an equivalent spelling"
        );
    }
    equivalent
}

fn significant(raw: RawDifference, config: &EquivalenceConfig) -> SignificantDifference {
    let mut description = match config.message_for(&raw.element_path, raw.attribute.as_deref()) {
        Some(template) => render_template(&template.template, &raw),
        None => generic_description(&raw),
    };
    if raw.confidence == Confidence::Ambiguous {
        description.push_str(LOW_CONFIDENCE_SUFFIX);
    }
    SignificantDifference {
        reference: Detail::new(Side::Reference, &raw.reference),
        candidate: Detail::new(Side::Candidate, &raw.candidate),
        description,
        raw,
    }
}

/// Substitutes `{kind}`, `{element}`, `{attribute}`, `{reference}` and
/// `{candidate}`. `{element}` is the element's XPath step, so keyed elements
/// show their key. Absent values render as `-`.
fn render_template(template: &str, raw: &RawDifference) -> String {
    template
        .replace("{kind}", raw.kind.as_str())
        .replace("{element}", raw.element_step())
        .replace("{attribute}", raw.attribute.as_deref().unwrap_or_default())
        .replace("{reference}", raw.reference.value.as_deref().unwrap_or("-"))
        .replace("{candidate}", raw.candidate.value.as_deref().unwrap_or("-"))
}

fn generic_description(raw: &RawDifference) -> String {
    let quote = |v: Option<&str>| v.map_or_else(|| "absent".to_owned(), |v| format!("'{v}'"));
    format!(
        "{}: reference {}, candidate {}",
        raw.description,
        quote(raw.reference.value.as_deref()),
        quote(raw.candidate.value.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::types::NodeDetail;

    fn attr_diff(path: &str, attribute: &str, a: Option<&str>, b: Option<&str>) -> RawDifference {
        let element = path.rsplit('/').next().unwrap_or_default().to_owned();
        RawDifference {
            kind: if attribute == TEXT_ATTRIBUTE {
                DifferenceKind::TextValueChanged
            } else {
                DifferenceKind::AttributeValueChanged
            },
            reference: NodeDetail {
                xpath: Some(format!("/x[@id='1']/@{attribute}")),
                value: a.map(str::to_owned),
            },
            candidate: NodeDetail {
                xpath: Some(format!("/x[@id='1']/@{attribute}")),
                value: b.map(str::to_owned),
            },
            description: format!("Attribute '{attribute}' of <{element}> changed"),
            element,
            element_path: path.to_owned(),
            attribute: Some(attribute.to_owned()),
            confidence: Confidence::Keyed,
        }
    }

    fn node_diff(kind: DifferenceKind, path: &str) -> RawDifference {
        let element = path.rsplit('/').next().unwrap_or_default().to_owned();
        RawDifference {
            kind,
            reference: NodeDetail {
                xpath: Some("/a[1]".to_owned()),
                value: None,
            },
            candidate: NodeDetail {
                xpath: Some(format!("/a[1]/{element}[1]")),
                value: Some(format!("<{element}>")),
            },
            description: format!("Unexpected element <{element}>"),
            element,
            element_path: path.to_owned(),
            attribute: None,
            confidence: Confidence::Keyed,
        }
    }

    fn config(json: &str) -> EquivalenceConfig {
        EquivalenceConfig::from_json(json).expect("config")
    }

    #[test]
    fn ignored_subtree_drops_nested_nodes() {
        let cfg = config(r#"{ "ignore": [ { "element_path": "//extensionElements", "reason": "vendor" } ] }"#);
        let raw = vec![
            node_diff(DifferenceKind::ExtraNode, "/definitions/process/extensionElements"),
            attr_diff("/definitions/process/extensionElements/prop", "value", Some("1"), Some("2")),
            node_diff(DifferenceKind::ExtraNode, "/definitions/process/task"),
        ];
        let out = filter(raw, &cfg);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].raw.element, "task");
    }

    #[test]
    fn equivalent_values_are_dropped_in_both_directions() {
        let cfg = config(
            r#"{ "equivalence_classes": [ { "canonical": "true", "spellings": ["1"] } ] }"#,
        );
        let forward = attr_diff("/definitions/process", "isExecutable", Some("1"), Some("true"));
        let backward = attr_diff("/definitions/process", "isExecutable", Some("true"), Some("1"));
        assert!(filter(vec![forward, backward], &cfg).is_empty());
    }

    #[test]
    fn missing_text_equals_empty_text() {
        let cfg = config(r##"{ "normalizations": [ { "attributes": ["#text"], "trim": true } ] }"##);
        let d = attr_diff("/a/documentation", TEXT_ATTRIBUTE, None, Some("   "));
        assert!(filter(vec![d], &cfg).is_empty());
    }

    #[test]
    fn trailing_space_is_significant_without_normalisation() {
        let d = attr_diff("/definitions/process/task", "name", Some("Review"), Some("Review "));
        let out = filter(vec![d], &EquivalenceConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].description,
            "Attribute 'name' of <task> changed: reference 'Review', candidate 'Review '"
        );
        assert_eq!(out[0].reference.message, "reference: /x[@id='1']/@name :\tReview");
        assert_eq!(out[0].candidate.side, Side::Candidate);
    }

    #[test]
    fn vendor_attribute_sharing_a_builtin_name_is_compared_literally() {
        let cfg = EquivalenceConfig::builtin().expect("builtin");
        let plain = attr_diff("/definitions/process", "isExecutable", Some("1"), Some("true"));
        let vendor = attr_diff(
            "/definitions/process",
            "{urn:vendor}isExecutable",
            Some("1"),
            Some("true"),
        );
        let out = filter(vec![plain, vendor], &cfg);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].raw.attribute.as_deref(),
            Some("{urn:vendor}isExecutable")
        );
    }

    #[test]
    fn schema_location_is_ignored_by_namespace() {
        let cfg = EquivalenceConfig::builtin().expect("builtin");
        let xsi = format!("{{{}}}schemaLocation", crate::document::XSI_NS);
        let out = filter(
            vec![
                attr_diff("/definitions", &xsi, Some("a.xsd"), None),
                attr_diff("/definitions", "{urn:vendor}schemaLocation", Some("a"), None),
            ],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].raw.attribute.as_deref(),
            Some("{urn:vendor}schemaLocation")
        );
    }

    #[test]
    fn trimmed_name_is_not_significant() {
        let cfg = config(r#"{ "normalizations": [ { "attributes": ["name"], "trim": true } ] }"#);
        let d = attr_diff("/definitions/process/task", "name", Some("Review"), Some("Review "));
        assert!(filter(vec![d], &cfg).is_empty());
    }

    #[test]
    fn template_placeholders_are_substituted() {
        let cfg = config(
            r#"{ "messages": [ { "element_path": "//sequenceFlow", "attribute": "targetRef",
                 "template": "{kind} on {element}: {attribute} {reference} -> {candidate}" } ] }"#,
        );
        let d = attr_diff("/definitions/process/sequenceFlow", "targetRef", Some("A"), None);
        let out = filter(vec![d], &cfg);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].description,
            "attribute_value_changed on x[@id='1']: targetRef A -> -"
        );
    }

    #[test]
    fn ambiguous_differences_are_flagged() {
        let mut d = attr_diff("/a/t", "n", Some("1"), Some("2"));
        d.confidence = Confidence::Ambiguous;
        let out = filter(vec![d], &EquivalenceConfig::default());
        assert!(out[0].description.ends_with(LOW_CONFIDENCE_SUFFIX));
    }

    #[test]
    fn node_differences_are_never_equivalent() {
        let cfg = EquivalenceConfig::builtin().expect("builtin");
        let out = filter(
            vec![node_diff(DifferenceKind::ExtraNode, "/definitions/process/task")],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].description,
            "Unexpected element <task>: reference absent, candidate '<task>'"
        );
    }
}
