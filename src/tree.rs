//! Dependency tree data structures
//!
//! Sentences are arenas: every node lives in `Sentence::nodes` and is
//! addressed by its index, relations live in `Sentence::relations` and
//! refer to nodes by index. Index 0 is always the virtual root.
//!
//! Each word has exactly one primary relation (its basic head). Enhanced
//! dependencies from the DEPS column are stored as secondary relations,
//! reachable both from the dependent (`heads`) and from the head
//! (`secondary_children`).

use crate::query::{Attribute, QueryError};
use std::fmt;
use std::ops::Deref;

/// Index of a node in its sentence arena
pub type NodeId = usize;

/// Index of a relation in its sentence arena
pub type RelationId = usize;

/// Arena index of the virtual root
pub const VIRTUAL_ROOT: NodeId = 0;

/// Token ID as written in the first CoNLL-U column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenId {
    /// Regular word: `3`
    Single(u32),
    /// Multiword token spanning words: `3-4`
    Range(u32, u32),
    /// Empty node: `3.1`
    Decimal(u32, u32),
}

impl TokenId {
    /// Integral part of the id (start of a range, main index of an empty node)
    pub fn major(&self) -> u32 {
        match *self {
            TokenId::Single(n) | TokenId::Range(n, _) | TokenId::Decimal(n, _) => n,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, TokenId::Range(_, _))
    }

    pub fn is_empty_node(&self) -> bool {
        matches!(self, TokenId::Decimal(_, _))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Single(n) => write!(f, "{}", n),
            TokenId::Range(start, end) => write!(f, "{}-{}", start, end),
            TokenId::Decimal(main, sub) => write!(f, "{}.{}", main, sub),
        }
    }
}

/// A single annotated token
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// ID column. The parser keeps it verbatim; `Node::new` writes the
    /// canonical form of `token_id` (`3.01` becomes `3.1`).
    pub id: String,
    pub token_id: TokenId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    /// FEATS column, verbatim (`_` when absent)
    pub feats: String,
    pub misc: String,
    pub(crate) head: Option<RelationId>,
    pub(crate) children: Vec<RelationId>,
    pub(crate) heads: Vec<RelationId>,
    pub(crate) secondary_children: Vec<RelationId>,
    /// HEAD column was `_` and the head was inferred from the id
    pub(crate) implicit_head: bool,
}

impl Node {
    /// Create a detached node from its attribute columns
    pub fn new(
        token_id: TokenId,
        form: &str,
        lemma: &str,
        upos: &str,
        xpos: &str,
        feats: &str,
        misc: &str,
    ) -> Self {
        Self {
            id: token_id.to_string(),
            token_id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            xpos: xpos.to_string(),
            feats: feats.to_string(),
            misc: misc.to_string(),
            head: None,
            children: Vec::new(),
            heads: Vec::new(),
            secondary_children: Vec::new(),
            implicit_head: false,
        }
    }

    fn virtual_root() -> Self {
        Self::new(TokenId::Single(0), "", "", "", "", "", "")
    }

    pub fn is_range(&self) -> bool {
        self.token_id.is_range()
    }

    pub fn is_empty_node(&self) -> bool {
        self.token_id.is_empty_node()
    }

    /// Attribute value stored on the node itself.
    ///
    /// `Deprel` lives on the head relation, so it resolves to `None` here;
    /// use `NodeRef::attribute` to include it.
    pub fn column(&self, attribute: Attribute) -> Option<&str> {
        match attribute {
            Attribute::Id => Some(&self.id),
            Attribute::Form => Some(&self.form),
            Attribute::Lemma => Some(&self.lemma),
            Attribute::Upos => Some(&self.upos),
            Attribute::Xpos => Some(&self.xpos),
            Attribute::Feats => Some(&self.feats),
            Attribute::Misc => Some(&self.misc),
            Attribute::Deprel => None,
        }
    }

    /// FEATS split on a delimiter (usually `|`)
    pub fn feats_list<'a>(&'a self, delimiter: &str) -> impl Iterator<Item = &'a str> {
        self.feats.split(delimiter)
    }

    /// Value of a single `Key=Value` feature
    pub fn feature(&self, name: &str) -> Option<&str> {
        self.feats
            .split('|')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

/// A labeled edge from a dependent to its head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub dependent: NodeId,
    pub label: String,
    pub head: NodeId,
    /// Basic (tree) relation as opposed to an enhanced one
    pub primary: bool,
}

/// One parsed sentence
#[derive(Debug, Clone)]
pub struct Sentence {
    /// Leading `#` lines, each terminated by a newline
    pub(crate) comments: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) root: Option<NodeId>,
    pub(crate) ranges: Vec<NodeId>,
}

impl Sentence {
    /// Create a sentence holding only the virtual root
    pub fn new() -> Self {
        Self {
            comments: String::new(),
            nodes: vec![Node::virtual_root()],
            relations: Vec::new(),
            root: None,
            ranges: Vec::new(),
        }
    }

    /// Add a node to the arena
    pub(crate) fn add_node(&mut self, node: Node) -> NodeId {
        let index = self.nodes.len();
        if node.is_range() {
            self.ranges.push(index);
        }
        self.nodes.push(node);
        index
    }

    /// Link `dependent` to `head` and return the new relation
    pub(crate) fn add_relation(
        &mut self,
        dependent: NodeId,
        label: &str,
        head: NodeId,
        primary: bool,
    ) -> RelationId {
        let index = self.relations.len();
        self.relations.push(Relation {
            dependent,
            label: label.to_string(),
            head,
            primary,
        });
        if primary {
            self.nodes[head].children.push(index);
            self.nodes[dependent].head = Some(index);
        } else {
            self.nodes[head].secondary_children.push(index);
            self.nodes[dependent].heads.push(index);
        }
        index
    }

    /// The word attached to the virtual root
    pub fn root(&self) -> Option<NodeRef<'_>> {
        self.root.map(|index| self.node(index))
    }

    /// The virtual root anchor (id `0`)
    pub fn virtual_root(&self) -> NodeRef<'_> {
        self.node(VIRTUAL_ROOT)
    }

    /// Get a node by arena index
    ///
    /// # Panics
    /// If `index` is out of bounds for this sentence.
    pub fn node(&self, index: NodeId) -> NodeRef<'_> {
        assert!(index < self.nodes.len(), "node index {} out of bounds", index);
        NodeRef {
            sentence: self,
            index,
        }
    }

    /// Get a node by arena index, if it exists
    pub fn get_node(&self, index: NodeId) -> Option<NodeRef<'_>> {
        (index < self.nodes.len()).then(|| NodeRef {
            sentence: self,
            index,
        })
    }

    /// Look a node up by its CoNLL-U id
    pub fn node_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
        self.nodes
            .iter()
            .skip(1)
            .position(|node| node.id == id)
            .map(|position| self.node(position + 1))
    }

    /// Leading `#` lines, each terminated by a newline
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Get a relation by arena index
    ///
    /// # Panics
    /// If `index` is out of bounds for this sentence.
    pub fn relation(&self, index: RelationId) -> RelationRef<'_> {
        assert!(
            index < self.relations.len(),
            "relation index {} out of bounds",
            index
        );
        RelationRef {
            sentence: self,
            index,
        }
    }

    /// Multiword range tokens, in document order
    pub fn ranges(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.ranges.iter().map(|&index| self.node(index))
    }

    /// Number of parsed tokens (words, empty nodes and ranges)
    pub fn token_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Whether the sentence holds no tokens at all
    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }
}

impl Default for Sentence {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of a node together with its sentence
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    sentence: &'a Sentence,
    index: NodeId,
}

impl<'a> NodeRef<'a> {
    /// Arena index within the sentence
    pub fn index(&self) -> NodeId {
        self.index
    }

    pub fn sentence(&self) -> &'a Sentence {
        self.sentence
    }

    pub fn node(&self) -> &'a Node {
        &self.sentence.nodes[self.index]
    }

    pub fn is_virtual_root(&self) -> bool {
        self.index == VIRTUAL_ROOT
    }

    /// Primary incoming relation
    pub fn head(&self) -> Option<RelationRef<'a>> {
        self.node().head.map(|index| self.sentence.relation(index))
    }

    /// Secondary incoming relations, in DEPS column order
    pub fn secondary_heads(self) -> impl Iterator<Item = RelationRef<'a>> + 'a {
        let sentence = self.sentence;
        self.node().heads.iter().map(move |&index| sentence.relation(index))
    }

    /// Primary outgoing relations, in document order of the dependents
    pub fn children(self) -> impl Iterator<Item = RelationRef<'a>> + 'a {
        let sentence = self.sentence;
        self.node()
            .children
            .iter()
            .map(move |&index| sentence.relation(index))
    }

    /// Secondary outgoing relations
    pub fn secondary_children(self) -> impl Iterator<Item = RelationRef<'a>> + 'a {
        let sentence = self.sentence;
        self.node()
            .secondary_children
            .iter()
            .map(move |&index| sentence.relation(index))
    }

    /// Label of the primary relation, `root` when there is none
    pub fn deprel(&self) -> &'a str {
        match self.head() {
            Some(relation) => relation.label(),
            None => "root",
        }
    }

    /// Resolve any attribute, including `deprel`
    pub fn attribute(&self, attribute: Attribute) -> &'a str {
        match self.node().column(attribute) {
            Some(value) => value,
            None => self.deprel(),
        }
    }

    /// Resolve an attribute by name (`lemma`, `upostag`, `deprel`, ...)
    pub fn get_attribute(&self, name: &str) -> Result<&'a str, QueryError> {
        Ok(self.attribute(name.parse()?))
    }
}

impl<'a> Deref for NodeRef<'a> {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.node()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.sentence, other.sentence) && self.index == other.index
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.node().id)
            .field("form", &self.node().form)
            .finish()
    }
}

/// Borrowed view of a relation together with its sentence
#[derive(Clone, Copy)]
pub struct RelationRef<'a> {
    sentence: &'a Sentence,
    index: RelationId,
}

impl<'a> RelationRef<'a> {
    pub fn index(&self) -> RelationId {
        self.index
    }

    pub fn relation(&self) -> &'a Relation {
        &self.sentence.relations[self.index]
    }

    pub fn label(&self) -> &'a str {
        &self.relation().label
    }

    pub fn is_primary(&self) -> bool {
        self.relation().primary
    }

    pub fn head(&self) -> NodeRef<'a> {
        self.sentence.node(self.relation().head)
    }

    pub fn dependent(&self) -> NodeRef<'a> {
        self.sentence.node(self.relation().dependent)
    }
}

// Relations are equal when their canonical `head:label` text is.
impl PartialEq for RelationRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.head().id == other.head().id && self.label() == other.label()
    }
}

impl Eq for RelationRef<'_> {}

impl fmt::Display for RelationRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.head().id, self.label())
    }
}

impl fmt::Debug for RelationRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelationRef({} -> {}, primary: {})",
            self.dependent().id,
            self,
            self.is_primary()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(n: u32, form: &str, upos: &str) -> Node {
        Node::new(TokenId::Single(n), form, form, upos, "_", "_", "_")
    }

    /// Build by hand:
    /// 0 (virtual)
    /// └─ 2: runs (root)
    ///    └─ 1: dog (nsubj), also 2:conj enhanced
    fn create_test_sentence() -> Sentence {
        let mut sentence = Sentence::new();
        let dog = sentence.add_node(word(1, "dog", "NOUN"));
        let runs = sentence.add_node(word(2, "runs", "VERB"));
        sentence.add_relation(runs, "root", VIRTUAL_ROOT, true);
        sentence.add_relation(dog, "nsubj", runs, true);
        sentence.add_relation(dog, "conj", runs, false);
        sentence.root = Some(runs);
        sentence
    }

    #[test]
    fn test_sentence_creation() {
        let sentence = Sentence::new();

        assert!(sentence.is_empty());
        assert!(sentence.root().is_none());
        assert_eq!(sentence.virtual_root().id, "0");
    }

    #[test]
    fn test_relations_link_both_ends() {
        let sentence = create_test_sentence();
        let runs = sentence.root().unwrap();
        let dog = sentence.node(1);

        assert_eq!(runs.form, "runs");
        assert_eq!(runs.head().unwrap().head().index(), VIRTUAL_ROOT);
        assert_eq!(dog.head().unwrap().head(), runs);
        assert_eq!(runs.children().count(), 1);
        assert_eq!(runs.secondary_children().count(), 1);
        assert_eq!(dog.secondary_heads().next().unwrap().label(), "conj");
        assert_eq!(sentence.virtual_root().children().count(), 1);
    }

    #[test]
    fn test_relation_canonical_text() {
        let sentence = create_test_sentence();
        let dog = sentence.node(1);
        let primary = dog.head().unwrap();
        let secondary = dog.secondary_heads().next().unwrap();

        assert_eq!(primary.to_string(), "2:nsubj");
        assert_eq!(secondary.to_string(), "2:conj");
        assert!(primary.is_primary());
        assert!(!secondary.is_primary());
        assert_ne!(primary, secondary);
    }

    #[test]
    fn test_attribute_resolution() {
        let sentence = create_test_sentence();
        let dog = sentence.node(1);

        assert_eq!(dog.attribute(Attribute::Lemma), "dog");
        assert_eq!(dog.attribute(Attribute::Upos), "NOUN");
        assert_eq!(dog.attribute(Attribute::Deprel), "nsubj");
        assert_eq!(dog.get_attribute("pos").unwrap(), "NOUN");
        assert!(matches!(
            dog.get_attribute("colour"),
            Err(QueryError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_features() {
        let node = Node::new(
            TokenId::Single(1),
            "cats",
            "cat",
            "NOUN",
            "N",
            "Case=Nom|Number=Plur",
            "_",
        );

        assert_eq!(node.feature("Number"), Some("Plur"));
        assert_eq!(node.feature("Tense"), None);
        assert_eq!(
            node.feats_list("|").collect::<Vec<_>>(),
            vec!["Case=Nom", "Number=Plur"]
        );
    }

    #[test]
    fn test_new_node_has_canonical_id() {
        let node = Node::new(TokenId::Decimal(3, 1), "x", "x", "X", "_", "_", "_");
        assert_eq!(node.id, "3.1");
    }

    #[test]
    #[should_panic(expected = "relation index 3 out of bounds")]
    fn test_relation_out_of_bounds() {
        let sentence = create_test_sentence();
        sentence.relation(3);
    }

    #[test]
    fn test_comments_accessor() {
        let mut sentence = Sentence::new();
        assert_eq!(sentence.comments(), "");

        sentence.comments.push_str("# sent_id = 1\n");
        assert_eq!(sentence.comments(), "# sent_id = 1\n");
    }

    #[test]
    fn test_token_id_display() {
        assert_eq!(TokenId::Single(7).to_string(), "7");
        assert_eq!(TokenId::Range(3, 4).to_string(), "3-4");
        assert_eq!(TokenId::Decimal(3, 1).to_string(), "3.1");
        assert_eq!(TokenId::Decimal(3, 1).major(), 3);
    }
}
