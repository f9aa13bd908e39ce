//! Collections of sentences
//!
//! A `Collection` holds every sentence of a CoNLL-U document, in document
//! order, and runs finds and aggregations across all of them.
//!
//! # Examples
//!
//! ```
//! use udtree::{Attribute, Collection, FindOptions, Query};
//!
//! let doc = "1\tCats\tcat\tNOUN\t_\t_\t2\tnsubj\t_\t_\n\
//!            2\tsleep\tsleep\tVERB\t_\t_\t0\troot\t_\t_\n";
//! let collection = Collection::parse(doc).unwrap();
//!
//! let cats = collection
//!     .find_words(&Query::new().with(Attribute::Lemma, "cat"), &FindOptions::new())
//!     .unwrap();
//! assert_eq!(cats.len(), 1);
//! ```

use crate::conllu::{DocumentError, SentenceReader};
use crate::query::{Attribute, FindOptions, Query, QueryError};
use crate::searcher::{NodeMatcher, unique};
use crate::tree::{NodeRef, Sentence};
use flate2::read::GzDecoder;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use tracing::{debug, warn};

/// An ordered, immutable sequence of sentences
#[derive(Debug, Clone, Default)]
pub struct Collection {
    sentences: Vec<Sentence>,
}

impl Collection {
    /// Parse a whole document, failing on the first bad sentence
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse a whole document, skipping sentences that fail to parse
    pub fn parse_lenient(text: &str) -> Self {
        let mut sentences = Vec::new();
        for (index, result) in SentenceReader::new(text.as_bytes()).enumerate() {
            match result {
                Ok(sentence) => sentences.push(sentence),
                Err(e) => warn!(sentence = index, error = %e, "skipping sentence"),
            }
        }
        Self { sentences }
    }

    /// Read a document from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DocumentError> {
        let sentences = SentenceReader::new(reader)
            .enumerate()
            .map(|(index, result)| {
                result.map_err(|source| DocumentError {
                    sentence: index,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(sentences = sentences.len(), "parsed collection");
        Ok(Self { sentences })
    }

    /// Read a gzip-compressed document
    pub fn from_gzip<R: Read>(reader: R) -> Result<Self, DocumentError> {
        Self::from_reader(BufReader::new(GzDecoder::new(reader)))
    }

    /// Matching words of every sentence, concatenated in document order
    pub fn find_words(
        &self,
        query: &Query,
        options: &FindOptions,
    ) -> Result<Vec<NodeRef<'_>>, QueryError> {
        let matcher = NodeMatcher::new(query, options)?;
        Ok(self
            .sentences
            .iter()
            .flat_map(|sentence| matcher.find_in(sentence))
            .collect())
    }

    /// Sentences with at least one matching word
    pub fn find_sentences(
        &self,
        query: &Query,
        options: &FindOptions,
    ) -> Result<Vec<&Sentence>, QueryError> {
        let matcher = NodeMatcher::new(query, options)?;
        Ok(self
            .sentences
            .iter()
            .filter(|sentence| matcher.any_in(sentence))
            .collect())
    }

    /// Distinct values of an attribute across the corpus, in order of first occurrence
    pub fn unique_attributes(&self, attribute: Attribute) -> Vec<&str> {
        unique(
            self.sentences
                .iter()
                .flat_map(|sentence| sentence.unique_attributes(attribute)),
        )
    }

    /// Distinct FEATS entries across the corpus, in order of first occurrence
    pub fn unique_feats(&self, delimiter: &str) -> Vec<&str> {
        unique(
            self.sentences
                .iter()
                .flat_map(|sentence| sentence.unique_feats(delimiter)),
        )
    }

    pub fn get(&self, index: usize) -> Option<&Sentence> {
        self.sentences.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }
}

impl From<Vec<Sentence>> for Collection {
    fn from(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Collection {
    type Item = Sentence;
    type IntoIter = std::vec::IntoIter<Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sentences.into_iter()
    }
}

/// Sentences separated by a blank line
impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sentence in &self.sentences {
            writeln!(f, "{}", sentence)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conllu::ParseError;

    const TWO_SENTENCES: &str = r#"# text = Cats sleep.
1	Cats	cat	NOUN	NNS	Number=Plur	2	nsubj	2:nsubj	_
2	sleep	sleep	VERB	VBP	Mood=Ind|Tense=Pres	0	root	0:root	_

# text = Dogs.
1	Dogs	dog	NOUN	NNS	Number=Plur	0	root	0:root	_

"#;

    fn lemma(value: &str) -> Query {
        Query::new().with(Attribute::Lemma, value)
    }

    #[test]
    fn test_collection_from_string() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(0).unwrap().len(), 2);
        assert_eq!(collection.get(1).unwrap().comments(), "# text = Dogs.\n");
        assert_eq!(collection.iter().count(), 2);
    }

    #[test]
    fn test_unique_attributes_first_occurrence() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();

        // preorder puts the root first within each sentence
        assert_eq!(collection.unique_attributes(Attribute::Upos), vec!["VERB", "NOUN"]);
        assert_eq!(
            collection.unique_attributes("lemma".parse().unwrap()),
            vec!["sleep", "cat", "dog"]
        );
    }

    #[test]
    fn test_unique_attributes_in_document_order() {
        let collection = Collection::parse(
            "1\tcat\tcat\tNOUN\t_\t_\t0\troot\t_\t_\n\
             2\truns\trun\tVERB\t_\t_\t1\tacl\t_\t_\n\
             \n\
             1\tdog\tdog\tNOUN\t_\t_\t0\troot\t_\t_\n",
        )
        .unwrap();

        assert_eq!(collection.unique_attributes(Attribute::Upos), vec!["NOUN", "VERB"]);
    }

    #[test]
    fn test_unique_feats() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();

        assert_eq!(
            collection.unique_feats("|"),
            vec!["Mood=Ind", "Tense=Pres", "Number=Plur"]
        );
    }

    #[test]
    fn test_find_words_across_sentences() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();
        let nouns = Query::new().with(Attribute::Upos, "NOUN");

        let found = collection.find_words(&nouns, &FindOptions::new()).unwrap();
        let forms: Vec<&str> = found.iter().map(|node| node.form.as_str()).collect();

        assert_eq!(forms, vec!["Cats", "Dogs"]);
    }

    #[test]
    fn test_find_sentences() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();

        let found = collection.find_sentences(&lemma("dog"), &FindOptions::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].comments(), "# text = Dogs.\n");

        let found = collection.find_sentences(&lemma("bird"), &FindOptions::new()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_with_bad_regex() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();
        let query = Query::new().with(Attribute::Form, "*");

        assert!(collection.find_words(&query, &FindOptions::new().regex(true)).is_err());
        assert!(collection.find_sentences(&query, &FindOptions::new().regex(true)).is_err());
    }

    #[test]
    fn test_document_error_names_the_sentence() {
        let text = "1\tok\tok\tX\t_\t_\t0\troot\t_\t_\n\
                    \n\
                    1\tbad\tbad\tX\t_\t_\t5\tdep\t_\t_\n";

        let err = Collection::parse(text).unwrap_err();
        assert_eq!(err.sentence, 1);
        assert!(matches!(err.source, ParseError::UnknownHead { line: 3, .. }));
    }

    #[test]
    fn test_parse_lenient_skips_bad_sentences() {
        let text = "1\tbad\tbad\tX\t_\t_\t5\tdep\t_\t_\n\
                    \n\
                    1\tok\tok\tX\t_\t_\t0\troot\t_\t_\n";

        let collection = Collection::parse_lenient(text);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(0).unwrap().root().unwrap().form, "ok");
    }

    #[test]
    fn test_display_round_trip() {
        let collection = Collection::parse(TWO_SENTENCES).unwrap();

        assert_eq!(collection.to_string(), TWO_SENTENCES);
    }
}
