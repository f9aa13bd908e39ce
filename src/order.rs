//! Canonical ordering of tokens and relations
//!
//! Token ids sort by their integral part. Within the same integral part a
//! range (`3-4`) comes first, then the word (`3`), then its empty nodes
//! (`3.1`, `3.2`, ...) by their fractional index.

use crate::tree::{NodeRef, RelationRef, TokenId};
use std::cmp::Ordering;

/// Sort key realising the canonical order: (integral part, class, minor)
#[inline]
fn sort_key(id: &TokenId) -> (u32, u8, u32) {
    match *id {
        TokenId::Range(start, end) => (start, 0, end),
        TokenId::Single(n) => (n, 1, 0),
        TokenId::Decimal(main, sub) => (main, 2, sub),
    }
}

/// Compare two token ids
pub fn compare_ids(a: &TokenId, b: &TokenId) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

impl PartialOrd for TokenId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenId {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_ids(self, other)
    }
}

/// Compare two nodes by their ids.
///
/// Ids are unique within a parsed sentence, so nodes of the same sentence
/// only compare equal to themselves.
pub fn compare_nodes(a: &NodeRef<'_>, b: &NodeRef<'_>) -> Ordering {
    compare_ids(&a.token_id, &b.token_id)
}

/// Compare two relations by head id, then label.
///
/// Relations with the same canonical `head:label` text are equal.
pub fn compare_relations(a: &RelationRef<'_>, b: &RelationRef<'_>) -> Ordering {
    compare_ids(&a.head().token_id, &b.head().token_id).then_with(|| a.label().cmp(b.label()))
}

/// Sort nodes into canonical order
pub fn sort_nodes(nodes: &mut [NodeRef<'_>]) {
    nodes.sort_by(compare_nodes);
}

/// Sort relations into canonical order
pub fn sort_relations(relations: &mut [RelationRef<'_>]) {
    relations.sort_by(compare_relations);
}
