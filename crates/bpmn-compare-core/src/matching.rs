/// Canonical node matching between a reference and a candidate document.
///
/// Both trees are walked in parallel from the roots, which are always paired.
/// Under every matched parent the children are grouped by element type and
/// paired within each group:
///
/// - children carrying a matching key (the configured key attribute, `id` by
///   default) are paired by key value, independent of document order;
/// - keyless children are paired by ordinal position, so reordering them is
///   visible;
/// - if a group contains a duplicate key on either side, the whole group
///   falls back to positional pairing and is marked [`Confidence::Ambiguous`].
///
/// Ambiguity is inherited: below an ambiguous pair, children are still paired
/// by key where possible, but every pair and leftover keeps
/// [`Confidence::Ambiguous`].
///
/// Children left over on either side are recorded on the parent pair and
/// never descended into.
use std::collections::{HashMap, HashSet};

use crate::config::EquivalenceConfig;
use crate::document::{Document, Element, QName};
use crate::types::{Confidence, Side};

/// An element together with its location in its own document.
#[derive(Debug, Clone)]
pub struct NodeRef<'d> {
    /// The element.
    pub element: &'d Element,
    /// XPath of the element in its document.
    pub xpath: String,
    /// Local-name path used by ignore rules (`/definitions/process/task`).
    pub path: String,
}

/// A reference element paired with its candidate counterpart.
#[derive(Debug, Clone)]
pub struct MatchedPair<'d> {
    /// Reference side.
    pub reference: NodeRef<'d>,
    /// Candidate side.
    pub candidate: NodeRef<'d>,
    /// How the pair was established.
    pub confidence: Confidence,
    /// Reference children without a candidate counterpart.
    pub missing: Vec<Unmatched<'d>>,
    /// Candidate children without a reference counterpart.
    pub extra: Vec<Unmatched<'d>>,
    /// Matched child pairs, in reference document order.
    pub children: Vec<MatchedPair<'d>>,
}

/// A child left without a counterpart, with the quality of the sibling
/// matching that left it over.
#[derive(Debug, Clone)]
pub struct Unmatched<'d> {
    /// The leftover child.
    pub node: NodeRef<'d>,
    /// [`Confidence::Ambiguous`] inside ambiguous groups and below ambiguous
    /// pairs, otherwise keyed or positional by whether the child has a key.
    pub confidence: Confidence,
}

impl<'d> MatchedPair<'d> {
    /// Visits this pair and every matched descendant pair, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a MatchedPair<'d>)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    fn side(&self, side: Side) -> &NodeRef<'d> {
        match side {
            Side::Reference => &self.reference,
            Side::Candidate => &self.candidate,
        }
    }

    /// Finds the pair whose `side` node sits at `xpath`, descending only into
    /// the child whose location is a prefix of `xpath`.
    fn locate(&self, side: Side, xpath: &str) -> Option<&MatchedPair<'d>> {
        let own = self.side(side).xpath.as_str();
        if own == xpath {
            return Some(self);
        }
        if !xpath.strip_prefix(own)?.starts_with('/') {
            return None;
        }
        self.children.iter().find_map(|c| c.locate(side, xpath))
    }
}

/// Correspondence between the nodes of two documents.
#[derive(Debug, Clone)]
pub struct MatchMap<'d> {
    /// The pair of root elements.
    pub root: MatchedPair<'d>,
    /// Duplicate-key diagnostics.
    pub warnings: Vec<String>,
}

impl<'d> MatchMap<'d> {
    /// Returns every matched pair, parents before children.
    pub fn pairs(&self) -> Vec<&MatchedPair<'d>> {
        let mut out = Vec::new();
        self.root.walk(&mut |p| out.push(p));
        out
    }

    /// Returns the candidate node matched to the reference node at `xpath`.
    pub fn candidate_for(&self, xpath: &str) -> Option<&NodeRef<'d>> {
        self.root
            .locate(Side::Reference, xpath)
            .map(|p| &p.candidate)
    }

    /// Returns the reference node matched to the candidate node at `xpath`.
    pub fn reference_for(&self, xpath: &str) -> Option<&NodeRef<'d>> {
        self.root
            .locate(Side::Candidate, xpath)
            .map(|p| &p.reference)
    }

    /// Reference nodes without a counterpart (subtree roots only).
    pub fn unmatched_reference(&self) -> Vec<&NodeRef<'d>> {
        self.pairs()
            .into_iter()
            .flat_map(|p| p.missing.iter().map(|u| &u.node))
            .collect()
    }

    /// Candidate nodes without a counterpart (subtree roots only).
    pub fn unmatched_candidate(&self) -> Vec<&NodeRef<'d>> {
        self.pairs()
            .into_iter()
            .flat_map(|p| p.extra.iter().map(|u| &u.node))
            .collect()
    }
}

/// Matches the nodes of `candidate` against those of `reference`.
pub fn match_documents<'d>(
    reference: &'d Document,
    candidate: &'d Document,
    config: &EquivalenceConfig,
) -> MatchMap<'d> {
    let mut warnings = Vec::new();

    let ref_key = key_value(&reference.root, config);
    let cand_key = key_value(&candidate.root, config);
    let confidence = match (ref_key, cand_key) {
        (Some(a), Some(b)) if a == b => Confidence::Keyed,
        (Some(_) | None, Some(_) | None) => Confidence::Positional,
    };

    let root = match_pair(
        root_ref(&reference.root, config),
        root_ref(&candidate.root, config),
        confidence,
        config,
        &mut warnings,
    );
    MatchMap { root, warnings }
}

fn root_ref<'d>(element: &'d Element, config: &EquivalenceConfig) -> NodeRef<'d> {
    let key = key_value(element, config).map(|v| (key_attr(element, config), v));
    NodeRef {
        element,
        xpath: format!("/{}", step(element, key, 1)),
        path: format!("/{}", element.name.local),
    }
}

fn match_pair<'d>(
    reference: NodeRef<'d>,
    candidate: NodeRef<'d>,
    confidence: Confidence,
    config: &EquivalenceConfig,
    warnings: &mut Vec<String>,
) -> MatchedPair<'d> {
    let mut pair = MatchedPair {
        reference,
        candidate,
        confidence,
        missing: Vec::new(),
        extra: Vec::new(),
        children: Vec::new(),
    };
    if pair.reference.element.name != pair.candidate.element.name {
        return pair;
    }

    let ref_element: &'d Element = pair.reference.element;
    let cand_element: &'d Element = pair.candidate.element;
    let ref_groups = group_by_type(&ref_element.children);
    let cand_groups = group_by_type(&cand_element.children);
    let cand_lookup: HashMap<&QName, &Vec<usize>> =
        cand_groups.iter().map(|(name, idx)| (*name, idx)).collect();
    let empty = Vec::new();

    let mut matched: Vec<(usize, NodeRef<'d>, NodeRef<'d>, Confidence)> = Vec::new();
    let mut missing: Vec<(usize, Unmatched<'d>)> = Vec::new();
    let mut extra: Vec<(usize, Unmatched<'d>)> = Vec::new();

    for (name, ref_idx) in &ref_groups {
        let cand_idx = cand_lookup.get(name).copied().unwrap_or(&empty);
        let outcome = match_group(&pair, name, ref_idx, cand_idx, config, warnings);
        matched.extend(outcome.matched);
        missing.extend(outcome.missing);
        extra.extend(outcome.extra);
    }

    let ref_names: HashSet<&QName> = ref_groups.iter().map(|(name, _)| *name).collect();
    for (name, cand_idx) in &cand_groups {
        if ref_names.contains(name) {
            continue;
        }
        let outcome = match_group(&pair, name, &[], cand_idx, config, warnings);
        extra.extend(outcome.extra);
    }

    matched.sort_by_key(|(i, ..)| *i);
    missing.sort_by_key(|(i, _)| *i);
    extra.sort_by_key(|(i, _)| *i);

    pair.missing = missing.into_iter().map(|(_, n)| n).collect();
    pair.extra = extra.into_iter().map(|(_, n)| n).collect();
    pair.children = matched
        .into_iter()
        .map(|(_, r, c, conf)| match_pair(r, c, conf, config, warnings))
        .collect();
    pair
}

struct GroupOutcome<'d> {
    matched: Vec<(usize, NodeRef<'d>, NodeRef<'d>, Confidence)>,
    missing: Vec<(usize, Unmatched<'d>)>,
    extra: Vec<(usize, Unmatched<'d>)>,
}

/// Pairs the same-type children `ref_idx` / `cand_idx` of a matched parent.
fn match_group<'d>(
    parent: &MatchedPair<'d>,
    name: &QName,
    ref_idx: &[usize],
    cand_idx: &[usize],
    config: &EquivalenceConfig,
    warnings: &mut Vec<String>,
) -> GroupOutcome<'d> {
    let ref_children: &'d [Element] = &parent.reference.element.children;
    let cand_children: &'d [Element] = &parent.candidate.element.children;

    let ref_keys: Vec<Option<&str>> = ref_idx
        .iter()
        .map(|&i| key_value(&ref_children[i], config))
        .collect();
    let cand_keys: Vec<Option<&str>> = cand_idx
        .iter()
        .map(|&i| key_value(&cand_children[i], config))
        .collect();

    let ambiguous = has_duplicates(&ref_keys) || has_duplicates(&cand_keys);
    let inherited = parent.confidence == Confidence::Ambiguous;
    if ambiguous {
        let message = format!(
            "duplicate matching keys for <{}> under {}; matched by position",
            name.local, parent.reference.xpath
        );
        tracing::warn!(element = %name.local, parent = %parent.reference.xpath, "{message}");
        warnings.push(message);
    }

    let key_name = config.key_attribute(&name.local).unwrap_or_default();
    let ref_node = |pos: usize| {
        let key = step_key(ambiguous, key_name, &ref_keys, pos);
        child_ref(&parent.reference, &ref_children[ref_idx[pos]], key, pos + 1)
    };
    let cand_node = |pos: usize| {
        let key = step_key(ambiguous, key_name, &cand_keys, pos);
        child_ref(&parent.candidate, &cand_children[cand_idx[pos]], key, pos + 1)
    };
    let graded = |confidence: Confidence| {
        if ambiguous || inherited {
            Confidence::Ambiguous
        } else {
            confidence
        }
    };
    let leftover = |node: NodeRef<'d>, keyed: bool| Unmatched {
        node,
        confidence: graded(if keyed {
            Confidence::Keyed
        } else {
            Confidence::Positional
        }),
    };

    let mut outcome = GroupOutcome {
        matched: Vec::new(),
        missing: Vec::new(),
        extra: Vec::new(),
    };

    if ambiguous {
        let common = ref_idx.len().min(cand_idx.len());
        for pos in 0..common {
            outcome
                .matched
                .push((ref_idx[pos], ref_node(pos), cand_node(pos), Confidence::Ambiguous));
        }
        for pos in common..ref_idx.len() {
            outcome
                .missing
                .push((ref_idx[pos], leftover(ref_node(pos), false)));
        }
        for pos in common..cand_idx.len() {
            outcome
                .extra
                .push((cand_idx[pos], leftover(cand_node(pos), false)));
        }
        return outcome;
    }

    let mut cand_by_key: HashMap<&str, usize> = cand_keys
        .iter()
        .enumerate()
        .filter_map(|(pos, key)| key.map(|k| (k, pos)))
        .collect();
    let cand_keyless: Vec<usize> = (0..cand_idx.len())
        .filter(|&pos| cand_keys[pos].is_none())
        .collect();
    let mut ref_keyless: Vec<usize> = Vec::new();

    for (pos, key) in ref_keys.iter().enumerate() {
        match key {
            Some(k) => match cand_by_key.remove(k) {
                Some(cpos) => outcome.matched.push((
                    ref_idx[pos],
                    ref_node(pos),
                    cand_node(cpos),
                    graded(Confidence::Keyed),
                )),
                None => outcome
                    .missing
                    .push((ref_idx[pos], leftover(ref_node(pos), true))),
            },
            None => ref_keyless.push(pos),
        }
    }

    for (i, &rpos) in ref_keyless.iter().enumerate() {
        match cand_keyless.get(i) {
            Some(&cpos) => outcome.matched.push((
                ref_idx[rpos],
                ref_node(rpos),
                cand_node(cpos),
                graded(Confidence::Positional),
            )),
            None => outcome
                .missing
                .push((ref_idx[rpos], leftover(ref_node(rpos), false))),
        }
    }
    for &cpos in cand_keyless.iter().skip(ref_keyless.len()) {
        outcome
            .extra
            .push((cand_idx[cpos], leftover(cand_node(cpos), false)));
    }
    for cpos in cand_by_key.into_values() {
        outcome
            .extra
            .push((cand_idx[cpos], leftover(cand_node(cpos), true)));
    }

    outcome
}

/// Key used in the XPath step of the child at `pos`; ambiguous groups use
/// positional steps only.
fn step_key<'k>(
    ambiguous: bool,
    key_name: &'k str,
    keys: &[Option<&'k str>],
    pos: usize,
) -> Option<(&'k str, &'k str)> {
    if ambiguous {
        return None;
    }
    keys.get(pos).copied().flatten().map(|v| (key_name, v))
}

fn child_ref<'d>(
    parent: &NodeRef<'d>,
    element: &'d Element,
    key: Option<(&str, &str)>,
    position: usize,
) -> NodeRef<'d> {
    NodeRef {
        element,
        xpath: format!("{}/{}", parent.xpath, step(element, key, position)),
        path: format!("{}/{}", parent.path, element.name.local),
    }
}

/// Groups child indices by element type, in order of first appearance.
fn group_by_type(children: &[Element]) -> Vec<(&QName, Vec<usize>)> {
    let mut groups: Vec<(&QName, Vec<usize>)> = Vec::new();
    for (i, child) in children.iter().enumerate() {
        match groups.iter_mut().find(|(name, _)| *name == &child.name) {
            Some((_, idx)) => idx.push(i),
            None => groups.push((&child.name, vec![i])),
        }
    }
    groups
}

fn key_attr<'c>(element: &Element, config: &'c EquivalenceConfig) -> &'c str {
    config.key_attribute(&element.name.local).unwrap_or_default()
}

fn key_value<'d>(element: &'d Element, config: &EquivalenceConfig) -> Option<&'d str> {
    let attr = config.key_attribute(&element.name.local)?;
    element.attribute(attr).filter(|v| !v.is_empty())
}

fn has_duplicates(keys: &[Option<&str>]) -> bool {
    let mut seen = HashSet::new();
    keys.iter().flatten().any(|k| !seen.insert(*k))
}

/// Builds one XPath step: `name[@key='value']` or `name[position]`.
fn step(element: &Element, key: Option<(&str, &str)>, position: usize) -> String {
    let name = element.name.qualified();
    match key {
        Some((attr, value)) => format!("{name}[@{attr}={}]", xpath_literal(value)),
        None => format!("{name}[{position}]"),
    }
}

fn xpath_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}
