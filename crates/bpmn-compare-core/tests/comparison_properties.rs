//! Property-based tests for the comparison laws.
//!
//! Generates small processes (keyed tasks plus keyless documentation) and
//! checks identity, order independence for keyed elements, order sensitivity
//! for positional elements, equivalence symmetry and ignore-rule soundness.
#![allow(clippy::expect_used)]

use bpmn_compare_core::{EquivalenceConfig, compare};
use proptest::prelude::*;

const MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

/// Builds a definitions document holding one process.
fn process_xml(
    is_executable: &str,
    tasks: &[(String, String)],
    docs: &[String],
    extension: Option<&str>,
) -> String {
    let mut body = String::new();
    if let Some(value) = extension {
        body.push_str(&format!(
            r#"<extensionElements><vendor:prop xmlns:vendor="urn:vendor" value="{value}"/></extensionElements>"#
        ));
    }
    for doc in docs {
        body.push_str(&format!("<documentation>{doc}</documentation>"));
    }
    for (id, name) in tasks {
        body.push_str(&format!(r#"<task id="{id}" name="{name}"/>"#));
    }
    format!(
        r#"<definitions xmlns="{MODEL_NS}" id="D" targetNamespace="urn:test"><process id="P" isExecutable="{is_executable}">{body}</process></definitions>"#
    )
}

fn tasks() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("T[0-9]{1,3}", "[a-z]{1,6}( [a-z]{1,6})?", 0..8)
        .prop_map(|m| m.into_iter().collect())
}

fn configs() -> Vec<EquivalenceConfig> {
    vec![
        EquivalenceConfig::default(),
        EquivalenceConfig::builtin().expect("builtin config"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A document compared with an identical copy has no significant differences.
    #[test]
    fn prop_identity(
        tasks in tasks(),
        docs in prop::collection::vec("[a-z ]{0,10}", 0..3),
        flag in prop::sample::select(vec!["true", "false", "1", "0"]),
    ) {
        let xml = process_xml(flag, &tasks, &docs, None);
        for config in configs() {
            let result = compare(&xml, &xml, &config).expect("well-formed");
            prop_assert!(result.differences.is_empty());
            prop_assert_eq!(result.raw_count, 0);
        }
    }

    /// Reordering id-keyed siblings never produces a difference.
    #[test]
    fn prop_keyed_order_independence(shuffled in tasks().prop_flat_map(|t| {
        (Just(t.clone()), Just(t).prop_shuffle())
    })) {
        let (original, reordered) = shuffled;
        let a = process_xml("true", &original, &[], None);
        let b = process_xml("true", &reordered, &[], None);
        let result = compare(&a, &b, &EquivalenceConfig::default()).expect("well-formed");
        prop_assert!(result.differences.is_empty());
    }

    /// Swapping two distinct keyless siblings is visible.
    #[test]
    fn prop_positional_order_sensitivity(
        first in "[a-z]{1,8}",
        second in "[a-z]{1,8}",
    ) {
        prop_assume!(first != second);
        let a = process_xml("true", &[], &[first.clone(), second.clone()], None);
        let b = process_xml("true", &[], &[second, first], None);
        let result = compare(&a, &b, &EquivalenceConfig::default()).expect("well-formed");
        prop_assert_eq!(result.differences.len(), 2);
    }

    /// Equivalent spellings are accepted in both directions.
    #[test]
    fn prop_equivalence_symmetry(
        pair in prop::sample::select(vec![("true", "1"), ("false", "0"), ("1", "true"), ("0", "false")]),
        tasks in tasks(),
    ) {
        let config = EquivalenceConfig::builtin().expect("builtin config");
        let a = process_xml(pair.0, &tasks, &[], None);
        let b = process_xml(pair.1, &tasks, &[], None);
        prop_assert!(compare(&a, &b, &config).expect("well-formed").is_equivalent());
        prop_assert!(compare(&b, &a, &config).expect("well-formed").is_equivalent());
    }

    /// Differences inside an ignored subtree never surface.
    #[test]
    fn prop_ignore_rule_soundness(
        tasks in tasks(),
        left in prop::option::of("[a-z0-9]{0,6}"),
        right in prop::option::of("[a-z0-9]{0,6}"),
    ) {
        let config = EquivalenceConfig::builtin().expect("builtin config");
        let a = process_xml("true", &tasks, &[], left.as_deref());
        let b = process_xml("true", &tasks, &[], right.as_deref());
        let result = compare(&a, &b, &config).expect("well-formed");
        prop_assert!(result.differences.is_empty());
    }
}
