//! CoNLL-U parsing
//!
//! Parses CoNLL-U blocks into `Sentence` arenas in two passes: the first
//! creates a node per token line, the second resolves HEAD and DEPS into
//! primary and secondary relations. Multiword range lines become detached
//! nodes without relations.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::tree::{Node, NodeId, Sentence, TokenId, VIRTUAL_ROOT};
use atoi::FromRadix10Checked;
use flate2::read::GzDecoder;
use memchr::memchr;
use rustc_hash::FxHashMap;
use std::io::{BufRead, BufReader, Cursor, Lines, Read};
use thiserror::Error;
use tracing::{debug, trace};

/// Placeholder for an absent column value
pub const PLACEHOLDER: &str = "_";

/// Error during CoNLL-U parsing; line numbers are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Parse error at line {line}: expected 10 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Parse error at line {line}: invalid token id {id:?}")]
    InvalidId { line: usize, id: String },

    #[error("Parse error at line {line}: duplicate token id {id:?}")]
    DuplicateId { line: usize, id: String },

    #[error("Parse error at line {line}: token {id:?} has no head")]
    MissingHead { line: usize, id: String },

    #[error("Parse error at line {line}: head {head:?} of token {id:?} does not exist")]
    UnknownHead {
        line: usize,
        id: String,
        head: String,
    },

    #[error("Parse error at line {line}: malformed deps entry {entry:?}")]
    MalformedDeps { line: usize, entry: String },

    #[error("Parse error in sentence at line {line}: tokens {ids} are not attached to the root")]
    Detached { line: usize, ids: String },

    #[error("IO error at line {line}: {message}")]
    Io { line: usize, message: String },
}

impl ParseError {
    /// Line the error was found on
    pub fn line(&self) -> usize {
        match self {
            ParseError::FieldCount { line, .. }
            | ParseError::InvalidId { line, .. }
            | ParseError::DuplicateId { line, .. }
            | ParseError::MissingHead { line, .. }
            | ParseError::UnknownHead { line, .. }
            | ParseError::MalformedDeps { line, .. }
            | ParseError::Detached { line, .. }
            | ParseError::Io { line, .. } => *line,
        }
    }
}

/// A parse failure inside a multi-sentence document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sentence {sentence}: {source}")]
pub struct DocumentError {
    /// 0-based index of the failing sentence
    pub sentence: usize,
    #[source]
    pub source: ParseError,
}

/// CoNLL-U reader that iterates over sentences
///
/// Blank lines end a sentence once it has token lines. Comment lines seen
/// before any token line belong to the next sentence.
pub struct SentenceReader<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
}

impl<R: BufRead> SentenceReader<R> {
    /// Create a reader over any buffered input
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl SentenceReader<BufReader<Cursor<String>>> {
    /// Create a reader from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Self {
        Self::new(BufReader::new(Cursor::new(text.to_string())))
    }
}

impl<R: Read> SentenceReader<BufReader<GzDecoder<R>>> {
    /// Create a reader over gzip-compressed CoNLL-U
    pub fn from_gzip(reader: R) -> Self {
        Self::new(BufReader::new(GzDecoder::new(reader)))
    }
}

impl<R: BufRead> Iterator for SentenceReader<R> {
    type Item = Result<Sentence, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut block: Vec<(usize, String)> = Vec::new();
        let mut has_tokens = false;

        loop {
            match self.lines.next() {
                None => {
                    if has_tokens {
                        break;
                    }
                    if !block.is_empty() {
                        trace!(lines = block.len(), "dropping trailing comment lines");
                    }
                    return None;
                }
                Some(Err(e)) => {
                    self.line_num += 1;
                    return Some(Err(ParseError::Io {
                        line: self.line_num,
                        message: e.to_string(),
                    }));
                }
                Some(Ok(line)) => {
                    self.line_num += 1;
                    let line = line.trim_end_matches('\r');

                    if line.trim().is_empty() {
                        if has_tokens {
                            break;
                        }
                        continue;
                    }

                    if !line.starts_with('#') {
                        has_tokens = true;
                    }
                    block.push((self.line_num, line.to_string()));
                }
            }
        }

        Some(parse_block(
            block.iter().map(|(line_num, line)| (*line_num, line.as_str())),
        ))
    }
}

/// Parse the lines of one sentence; blank lines are skipped
pub fn parse_sentence(text: &str) -> Result<Sentence, ParseError> {
    parse_block(
        text.lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r'))),
    )
}

/// Column data kept for the relation pass
struct PendingRelation<'a> {
    node: NodeId,
    line: usize,
    id: &'a str,
    head: &'a str,
    deprel: &'a str,
    deps: &'a str,
}

/// Parse numbered lines into a Sentence
pub(crate) fn parse_block<'a, I>(lines: I) -> Result<Sentence, ParseError>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut sentence = Sentence::new();
    let mut ids: FxHashMap<&'a str, NodeId> = FxHashMap::default();
    let mut pending: Vec<PendingRelation<'a>> = Vec::new();
    let mut first_line = 0;

    ids.insert("0", VIRTUAL_ROOT);

    for (line_num, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        if first_line == 0 {
            first_line = line_num;
        }

        if line.starts_with('#') {
            sentence.comments.push_str(line);
            sentence.comments.push('\n');
            continue;
        }

        let fields: Vec<&'a str> = line.split('\t').collect();
        if fields.len() != 10 {
            return Err(ParseError::FieldCount {
                line: line_num,
                found: fields.len(),
            });
        }

        let id = fields[0];
        let token_id = parse_id(id).ok_or_else(|| ParseError::InvalidId {
            line: line_num,
            id: id.to_string(),
        })?;
        if ids.contains_key(id) {
            return Err(ParseError::DuplicateId {
                line: line_num,
                id: id.to_string(),
            });
        }

        let mut node = Node::new(
            token_id, fields[1], fields[2], fields[3], fields[4], fields[5], fields[9],
        );
        node.id = id.to_string();
        let index = sentence.add_node(node);
        ids.insert(id, index);

        // Range tokens only hold attributes
        if token_id.is_range() {
            continue;
        }

        pending.push(PendingRelation {
            node: index,
            line: line_num,
            id,
            head: fields[6],
            deprel: fields[7],
            deps: fields[8],
        });
    }

    for rel in &pending {
        let implicit = rel.head == PLACEHOLDER;
        let head_id = if implicit {
            if !sentence.nodes[rel.node].is_empty_node() {
                return Err(ParseError::MissingHead {
                    line: rel.line,
                    id: rel.id.to_string(),
                });
            }
            integral_part(rel.id)
        } else {
            rel.head
        };

        let head = resolve_head(&sentence, &ids, head_id, rel)?;
        sentence.add_relation(rel.node, rel.deprel, head, true);
        sentence.nodes[rel.node].implicit_head = implicit;
        // Only a HEAD column of literally `0` makes the root
        if !implicit && rel.head == "0" && sentence.root.is_none() {
            sentence.root = Some(rel.node);
        }

        if rel.deps == PLACEHOLDER {
            continue;
        }

        for entry in rel.deps.split('|') {
            let (dep_head, label) = match entry.split_once(':') {
                Some((dep_head, label)) if !dep_head.is_empty() && !label.is_empty() => {
                    (dep_head, label)
                }
                _ => {
                    return Err(ParseError::MalformedDeps {
                        line: rel.line,
                        entry: entry.to_string(),
                    });
                }
            };

            // Already present as the primary relation
            if dep_head == head_id && label == rel.deprel {
                continue;
            }

            let head = resolve_head(&sentence, &ids, dep_head, rel)?;
            sentence.add_relation(rel.node, label, head, false);
        }
    }

    check_attached(&sentence, first_line)?;

    debug!(
        line = first_line,
        tokens = sentence.token_count(),
        "parsed sentence"
    );

    Ok(sentence)
}

/// Look up a head by id; range tokens cannot be heads
fn resolve_head(
    sentence: &Sentence,
    ids: &FxHashMap<&str, NodeId>,
    head_id: &str,
    rel: &PendingRelation<'_>,
) -> Result<NodeId, ParseError> {
    match ids.get(head_id) {
        Some(&index) if !sentence.nodes[index].is_range() => Ok(index),
        _ => Err(ParseError::UnknownHead {
            line: rel.line,
            id: rel.id.to_string(),
            head: head_id.to_string(),
        }),
    }
}

/// Every non-range token must hang below the virtual root
fn check_attached(sentence: &Sentence, first_line: usize) -> Result<(), ParseError> {
    let mut visited = vec![false; sentence.nodes.len()];
    let mut stack = vec![VIRTUAL_ROOT];

    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        stack.extend(
            sentence.nodes[index]
                .children
                .iter()
                .map(|&rel| sentence.relations[rel].dependent),
        );
    }

    let detached: Vec<&str> = sentence
        .nodes
        .iter()
        .zip(&visited)
        .filter(|(node, seen)| !**seen && !node.is_range())
        .map(|(node, _)| node.id.as_str())
        .collect();

    if detached.is_empty() {
        Ok(())
    } else {
        Err(ParseError::Detached {
            line: first_line,
            ids: detached.join(", "),
        })
    }
}

/// Parse ID field (can be integer, range, or decimal)
pub fn parse_id(s: &str) -> Option<TokenId> {
    let bytes = s.as_bytes();

    if let Some(pos) = memchr(b'-', bytes) {
        let start = parse_number(&bytes[..pos])?;
        let end = parse_number(&bytes[pos + 1..])?;
        return Some(TokenId::Range(start, end));
    }

    if let Some(pos) = memchr(b'.', bytes) {
        let main = parse_number(&bytes[..pos])?;
        let sub = parse_number(&bytes[pos + 1..])?;
        return Some(TokenId::Decimal(main, sub));
    }

    parse_number(bytes).map(TokenId::Single)
}

/// Whole-slice decimal number
#[inline]
fn parse_number(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    match u32::from_radix_10_checked(bytes) {
        (Some(n), used) if used == bytes.len() => Some(n),
        _ => None,
    }
}

/// Part of an id before the first literal dot
fn integral_part(id: &str) -> &str {
    match memchr(b'.', id.as_bytes()) {
        Some(pos) => &id[..pos],
        None => id,
    }
}
