//! Attribute search over sentences
//!
//! A find walks the primary tree depth-first in preorder, starting below
//! the virtual root. Every visited node is tested against the attribute
//! query and, if it passes, against the head query; the walk descends into
//! the children whether or not the node itself matched. Range tokens sit
//! outside the tree and are tested after the walk when requested.

use crate::order::sort_nodes;
use crate::query::{Attribute, CompiledQuery, FindOptions, Query, QueryError};
use crate::tree::{NodeId, NodeRef, RelationRef, Sentence, VIRTUAL_ROOT};
use rustc_hash::FxHashSet;
use std::iter::once;
use tracing::trace;

/// A query and its options, compiled once and reusable across sentences
#[derive(Debug, Clone)]
pub(crate) struct NodeMatcher {
    query: CompiledQuery,
    head: CompiledQuery,
    include_ranges: bool,
    include_empty_nodes: bool,
    enhanced: bool,
}

impl NodeMatcher {
    pub(crate) fn new(query: &Query, options: &FindOptions) -> Result<Self, QueryError> {
        trace!(
            terms = query.len(),
            head_terms = options.head.len(),
            mode = ?options.mode,
            "compiling find"
        );
        Ok(Self {
            query: CompiledQuery::compile(query, options.mode)?,
            head: CompiledQuery::compile(&options.head, options.mode)?,
            include_ranges: options.include_ranges,
            include_empty_nodes: options.include_empty_nodes,
            enhanced: options.enhanced,
        })
    }

    /// Empty queries; lists words, or every token with `all`
    fn listing(all: bool) -> Self {
        Self {
            query: CompiledQuery::default(),
            head: CompiledQuery::default(),
            include_ranges: all,
            include_empty_nodes: all,
            enhanced: false,
        }
    }

    /// All matching nodes of a sentence, in preorder
    pub(crate) fn find_in<'s>(&self, sentence: &'s Sentence) -> Vec<NodeRef<'s>> {
        let mut results = Vec::new();
        let mut stack: Vec<NodeId> = children_of(sentence, VIRTUAL_ROOT).rev().collect();

        while let Some(index) = stack.pop() {
            let node = sentence.node(index);
            if self.accepts(node) {
                results.push(node);
            }
            stack.extend(children_of(sentence, index).rev());
        }

        if self.include_ranges {
            results.extend(sentence.ranges().filter(|&node| self.accepts(node)));
        }

        results
    }

    /// Whether any node of the sentence matches
    pub(crate) fn any_in(&self, sentence: &Sentence) -> bool {
        !self.find_in(sentence).is_empty()
    }

    fn accepts(&self, node: NodeRef<'_>) -> bool {
        if (node.is_range() && !self.include_ranges)
            || (node.is_empty_node() && !self.include_empty_nodes)
        {
            return false;
        }

        if !self.query.matches(|attribute| node.attribute(attribute)) {
            return false;
        }

        match node.head() {
            None => self.head.is_empty(),
            Some(_) if self.head.is_empty() => true,
            Some(primary) if self.enhanced => node
                .secondary_heads()
                .chain(once(primary))
                .any(|relation| self.head_matches(relation)),
            Some(primary) => self.head_matches(primary),
        }
    }

    /// `deprel` is read from the relation, everything else from its head
    fn head_matches(&self, relation: RelationRef<'_>) -> bool {
        self.head.matches(|attribute| match attribute {
            Attribute::Deprel => relation.label(),
            other => relation.head().attribute(other),
        })
    }
}

fn children_of(sentence: &Sentence, index: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
    sentence.nodes[index]
        .children
        .iter()
        .map(|&rel| sentence.relations[rel].dependent)
}

impl Sentence {
    /// Find the nodes matching `query` and the head query of `options`
    pub fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<NodeRef<'_>>, QueryError> {
        Ok(NodeMatcher::new(query, options)?.find_in(self))
    }

    /// Words of the tree in preorder, without ranges and empty nodes
    pub fn find_all(&self) -> Vec<NodeRef<'_>> {
        NodeMatcher::listing(false).find_in(self)
    }

    /// Every token: the tree in preorder, then the range tokens
    pub fn tokens(&self) -> Vec<NodeRef<'_>> {
        NodeMatcher::listing(true).find_in(self)
    }

    /// Words in canonical order
    pub fn sorted_nodes(&self) -> Vec<NodeRef<'_>> {
        let mut nodes = self.find_all();
        sort_nodes(&mut nodes);
        nodes
    }

    /// The `index`-th word in canonical order
    pub fn get(&self, index: usize) -> Option<NodeRef<'_>> {
        self.sorted_nodes().get(index).copied()
    }

    /// Iterate over the words in canonical order
    pub fn iter(&self) -> std::vec::IntoIter<NodeRef<'_>> {
        self.sorted_nodes().into_iter()
    }

    /// Number of words (ranges and empty nodes excluded)
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|node| !node.is_range() && !node.is_empty_node())
            .count()
    }

    /// Distinct values of an attribute, in order of first occurrence
    pub fn unique_attributes(&self, attribute: Attribute) -> Vec<&str> {
        unique(self.find_all().into_iter().map(|node| node.attribute(attribute)))
    }

    /// Distinct FEATS entries split on `delimiter`, in order of first occurrence
    pub fn unique_feats(&self, delimiter: &str) -> Vec<&str> {
        unique(
            self.find_all()
                .into_iter()
                .flat_map(|node| node.node().feats_list(delimiter))
                .filter(|feat| *feat != crate::conllu::PLACEHOLDER),
        )
    }
}

impl<'a> IntoIterator for &'a Sentence {
    type Item = NodeRef<'a>;
    type IntoIter = std::vec::IntoIter<NodeRef<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Deduplicate, keeping the first occurrence
pub(crate) fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = FxHashSet::default();
    values.filter(|value| seen.insert(*value)).collect()
}
