//! Udtree: Universal Dependencies trees in Rust
//!
//! Parses CoNLL-U into sentence arenas with primary and enhanced
//! relations, searches them by attribute and head constraints, and writes
//! them back in canonical order.
//!
//! ```
//! use udtree::{parse_sentence, Attribute, FindOptions, Query};
//!
//! let sentence = parse_sentence(
//!     "1\tdogs\tdog\tNOUN\t_\t_\t2\tnsubj\t_\t_\n\
//!      2\tbark\tbark\tVERB\t_\t_\t0\troot\t_\t_\n",
//! )
//! .unwrap();
//!
//! let options = FindOptions::new().head(Query::new().with(Attribute::Upos, "VERB"));
//! let found = sentence.find(&Query::new(), &options).unwrap();
//! assert_eq!(found[0].form, "dogs");
//! ```

pub mod cg3; // Analyzer / disambiguator boundary
pub mod collection; // Whole documents
pub mod conllu; // CoNLL-U file parsing
pub mod order; // Canonical token order
pub mod query; // Attribute queries and find options
pub mod searcher; // Preorder find walk
pub mod tree; // Sentence arena with primary and enhanced relations
pub mod writer; // CoNLL-U serialization

// Re-exports for convenience
pub use cg3::{Analyzer, Cg3, Cg3Error, Cg3Word, Disambiguator};
pub use collection::Collection;
pub use conllu::{DocumentError, ParseError, SentenceReader, parse_sentence};
pub use order::{compare_ids, compare_nodes, compare_relations};
pub use query::{Attribute, FindOptions, MatchMode, Query, QueryError};
pub use tree::{Node, NodeId, NodeRef, Relation, RelationRef, Sentence, TokenId};
