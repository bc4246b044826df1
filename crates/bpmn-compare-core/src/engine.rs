/// Difference engine: literal comparison of matched element pairs.
///
/// The engine walks a [`MatchMap`] and reports every literal difference it
/// sees. It makes no judgement about significance; that is the job of
/// [`crate::filter`].
use crate::config::TEXT_ATTRIBUTE;
use crate::document::{Element, XmlAttribute};
use crate::matching::{MatchMap, MatchedPair, NodeRef};
use crate::types::{Confidence, DifferenceKind, NodeDetail, RawDifference};

/// Returns all raw differences between the two documents of `map`, in
/// reference document order.
///
/// # Algorithm
///
/// For every matched pair, parents first:
///
/// 1. If the element types differ (only possible for the roots), emit a
///    missing and an extra node for the pair and stop.
/// 2. Compare attributes present on either side, reference order first.
/// 3. Compare direct text when both elements are leaves.
/// 4. Emit the pair's missing children, then its extra children.
/// 5. Recurse into the matched children.
pub fn diff(map: &MatchMap<'_>) -> Vec<RawDifference> {
    let mut out = Vec::new();
    diff_pair(&map.root, &mut out);
    out
}

fn diff_pair(pair: &MatchedPair<'_>, out: &mut Vec<RawDifference>) {
    let reference = &pair.reference;
    let candidate = &pair.candidate;

    if reference.element.name != candidate.element.name {
        out.push(node_difference(
            DifferenceKind::MissingNode,
            reference,
            candidate,
            pair.confidence,
        ));
        out.push(node_difference(
            DifferenceKind::ExtraNode,
            candidate,
            reference,
            pair.confidence,
        ));
        return;
    }

    compare_attributes(pair, out);

    if reference.element.is_leaf()
        && candidate.element.is_leaf()
        && reference.element.text != candidate.element.text
    {
        out.push(RawDifference {
            kind: DifferenceKind::TextValueChanged,
            reference: NodeDetail {
                xpath: Some(format!("{}/text()", reference.xpath)),
                value: reference.element.text.clone(),
            },
            candidate: NodeDetail {
                xpath: Some(format!("{}/text()", candidate.xpath)),
                value: candidate.element.text.clone(),
            },
            element: reference.element.name.local.clone(),
            element_path: reference.path.clone(),
            attribute: Some(TEXT_ATTRIBUTE.to_owned()),
            confidence: pair.confidence,
            description: format!("Text of <{}> changed", reference.element.name.local),
        });
    }

    for unmatched in &pair.missing {
        out.push(node_difference(
            DifferenceKind::MissingNode,
            &unmatched.node,
            candidate,
            unmatched.confidence,
        ));
    }
    for unmatched in &pair.extra {
        out.push(node_difference(
            DifferenceKind::ExtraNode,
            &unmatched.node,
            reference,
            unmatched.confidence,
        ));
    }

    for child in &pair.children {
        diff_pair(child, out);
    }
}

fn compare_attributes(pair: &MatchedPair<'_>, out: &mut Vec<RawDifference>) {
    let reference = &pair.reference;
    let candidate = &pair.candidate;

    for attr in &reference.element.attributes {
        let other = candidate.element.attribute_by_name(&attr.name);
        if other.map(|o| o.value.as_str()) != Some(attr.value.as_str()) {
            out.push(attribute_difference(pair, Some(attr), other));
        }
    }
    for attr in &candidate.element.attributes {
        if reference.element.attribute_by_name(&attr.name).is_none() {
            out.push(attribute_difference(pair, None, Some(attr)));
        }
    }
}

fn attribute_difference(
    pair: &MatchedPair<'_>,
    reference: Option<&XmlAttribute>,
    candidate: Option<&XmlAttribute>,
) -> RawDifference {
    let detail = |node: &NodeRef<'_>, attr: Option<&XmlAttribute>| match attr {
        Some(attr) => NodeDetail {
            xpath: Some(format!("{}/@{}", node.xpath, attr.name.qualified())),
            value: Some(attr.value.clone()),
        },
        None => NodeDetail {
            xpath: Some(node.xpath.clone()),
            value: None,
        },
    };
    let (key, shown) = reference
        .or(candidate)
        .map(|a| (a.name.expanded(), a.name.qualified()))
        .unwrap_or_default();
    let element = pair.reference.element.name.local.clone();

    RawDifference {
        kind: DifferenceKind::AttributeValueChanged,
        reference: detail(&pair.reference, reference),
        candidate: detail(&pair.candidate, candidate),
        description: format!("Attribute '{shown}' of <{element}> changed"),
        element,
        element_path: pair.reference.path.clone(),
        attribute: Some(key),
        confidence: pair.confidence,
    }
}

/// Builds a missing (or extra) node difference for `node`; `other_parent` is
/// the location on the side that has no counterpart.
fn node_difference(
    kind: DifferenceKind,
    node: &NodeRef<'_>,
    other_parent: &NodeRef<'_>,
    confidence: Confidence,
) -> RawDifference {
    let present = NodeDetail {
        xpath: Some(node.xpath.clone()),
        value: Some(start_tag(node.element)),
    };
    let absent = NodeDetail {
        xpath: Some(other_parent.xpath.clone()),
        value: None,
    };
    let element = node.element.name.local.clone();
    let (reference, candidate, description) = match kind {
        DifferenceKind::ExtraNode => (absent, present, format!("Unexpected element <{element}>")),
        DifferenceKind::MissingNode
        | DifferenceKind::AttributeValueChanged
        | DifferenceKind::TextValueChanged => {
            (present, absent, format!("Missing element <{element}>"))
        }
    };
    RawDifference {
        kind,
        reference,
        candidate,
        element,
        element_path: node.path.clone(),
        attribute: None,
        confidence,
        description,
    }
}

/// Short rendering of an element's start tag, e.g. `<task id="T1">`.
fn start_tag(element: &Element) -> String {
    let mut tag = format!("<{}", element.name.qualified());
    for attr in &element.attributes {
        tag.push_str(&format!(" {}=\"{}\"", attr.name.qualified(), attr.value));
    }
    tag.push('>');
    tag
}
