//! Attribute queries
//!
//! A `Query` is an ordered list of `(attribute, value)` terms. It can be
//! built programmatically or parsed from text with a small pest grammar:
//!
//! ```text
//! lemma="cat", upostag="NOUN"
//! ```
//!
//! `FindOptions` carries the head query and the flags that control a find.

use pest::Parser;
use pest_derive::Parser;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

/// Error type for query failures
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query error: unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Query error: invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Query error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
}

/// The closed set of attributes a query can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Id,
    Form,
    Lemma,
    Upos,
    Xpos,
    Feats,
    Misc,
    /// Label of the relation to the head
    Deprel,
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Id => "id",
            Attribute::Form => "form",
            Attribute::Lemma => "lemma",
            Attribute::Upos => "upostag",
            Attribute::Xpos => "xpostag",
            Attribute::Feats => "feats",
            Attribute::Misc => "misc",
            Attribute::Deprel => "deprel",
        }
    }
}

impl FromStr for Attribute {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Attribute::Id),
            "form" => Ok(Attribute::Form),
            "lemma" => Ok(Attribute::Lemma),
            "upostag" | "upos" | "pos" => Ok(Attribute::Upos),
            "xpostag" | "xpos" => Ok(Attribute::Xpos),
            "feats" => Ok(Attribute::Feats),
            "misc" => Ok(Attribute::Misc),
            "deprel" => Ok(Attribute::Deprel),
            _ => Err(QueryError::UnknownAttribute(s.to_string())),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered attribute query; an empty query matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<(Attribute, String)>,
}

impl Query {
    /// The empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term
    pub fn with(mut self, attribute: Attribute, value: &str) -> Self {
        self.terms.push((attribute, value.to_string()));
        self
    }

    /// Build from `(name, value)` pairs, rejecting unknown attribute names
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut query = Query::new();
        for (key, value) in pairs {
            let attribute = key.as_ref().parse()?;
            query = query.with(attribute, value.as_ref());
        }
        Ok(query)
    }

    /// Parse the textual form: `key="value", key="value"`
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut pairs = QueryParser::parse(Rule::query, input).map_err(Box::new)?;
        let mut query = Query::new();

        let Some(query_pair) = pairs.next() else {
            return Ok(query);
        };

        for term in query_pair.into_inner() {
            if term.as_rule() != Rule::term {
                continue; // EOI
            }
            let mut inner = term.into_inner();
            let (Some(key), Some(value)) = (inner.next(), inner.next()) else {
                continue;
            };
            let attribute: Attribute = key.as_str().parse()?;
            let raw = value.into_inner().as_str();
            query = query.with(attribute, &raw.replace("\\\"", "\""));
        }

        Ok(query)
    }

    pub fn terms(&self) -> &[(Attribute, String)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::parse(s)
    }
}

/// How query values are compared against attribute values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every term must equal the attribute value
    #[default]
    Literal,
    /// Regex search on the first term only; later terms are not evaluated
    Regex,
    /// Regex search on every term
    RegexAll,
}

/// Head query and flags for a find
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub head: Query,
    pub include_ranges: bool,
    pub include_empty_nodes: bool,
    /// Also try secondary (enhanced) heads when matching the head query
    pub enhanced: bool,
    pub mode: MatchMode,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match everything the sentence holds, ranges and empty nodes included
    pub fn everything() -> Self {
        Self::new().ranges(true).empty_nodes(true)
    }

    pub fn head(mut self, head: Query) -> Self {
        self.head = head;
        self
    }

    pub fn ranges(mut self, include: bool) -> Self {
        self.include_ranges = include;
        self
    }

    pub fn empty_nodes(mut self, include: bool) -> Self {
        self.include_empty_nodes = include;
        self
    }

    pub fn enhanced(mut self, enhanced: bool) -> Self {
        self.enhanced = enhanced;
        self
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(MatchMode::Regex)`
    pub fn regex(self, regex: bool) -> Self {
        self.mode(if regex {
            MatchMode::Regex
        } else {
            MatchMode::Literal
        })
    }
}

/// A query value ready for comparison
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    #[inline]
    pub(crate) fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Literal(expected) => expected == value,
            Matcher::Regex(re) => re.is_match(value),
        }
    }
}

/// A query whose regexes have been compiled once
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledQuery {
    pub(crate) terms: Vec<(Attribute, Matcher)>,
    /// Stop after the first term, whatever its outcome
    pub(crate) first_only: bool,
}

impl CompiledQuery {
    pub(crate) fn compile(query: &Query, mode: MatchMode) -> Result<Self, QueryError> {
        let terms = query
            .terms
            .iter()
            .map(|(attribute, value)| {
                let matcher = match mode {
                    MatchMode::Literal => Matcher::Literal(value.clone()),
                    MatchMode::Regex | MatchMode::RegexAll => {
                        let re = Regex::new(value).map_err(|source| QueryError::InvalidRegex {
                            pattern: value.clone(),
                            source,
                        })?;
                        Matcher::Regex(re)
                    }
                };
                Ok((*attribute, matcher))
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        Ok(Self {
            terms,
            first_only: mode == MatchMode::Regex,
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against a resolver of attribute values
    pub(crate) fn matches<'v>(&self, resolve: impl Fn(Attribute) -> &'v str) -> bool {
        if self.first_only {
            return match self.terms.first() {
                Some((attribute, matcher)) => matcher.matches(resolve(*attribute)),
                None => true,
            };
        }
        self.terms
            .iter()
            .all(|(attribute, matcher)| matcher.matches(resolve(*attribute)))
    }
}
