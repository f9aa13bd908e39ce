//! Constraint Grammar disambiguation boundary
//!
//! Disambiguation runs in two external collaborators: a morphological
//! analyzer proposing weighted readings per word, and a CG-3 style
//! disambiguator that filters them. This module owns the text formats
//! exchanged with them. Readings go out as HFST-style lines
//! (`word\treading\tweight`, one blank line after each word) and come
//! back as cohorts:
//!
//! ```text
//! "<dogs>"
//! 	"dog" N Pl
//! ```

use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Reading emitted for a word without analyses
const UNKNOWN_TAG: &str = "+?";

/// Error reported by an analyzer or disambiguator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Cg3Error {
    #[error("analysis of {word:?} failed: {message}")]
    Analysis { word: String, message: String },

    #[error("disambiguation failed: {0}")]
    Disambiguation(String),
}

/// One surviving reading of a word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cg3Word {
    pub form: String,
    pub lemma: String,
    pub morphology: Vec<String>,
}

impl Cg3Word {
    pub fn new(form: impl Into<String>, lemma: impl Into<String>, morphology: Vec<String>) -> Self {
        Self {
            form: form.into(),
            lemma: lemma.into(),
            morphology,
        }
    }
}

impl fmt::Display for Cg3Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} - {}>", self.lemma, self.morphology.join(", "))
    }
}

/// Morphological analyzer
pub trait Analyzer {
    /// Weighted readings of `word`; empty when the word is unknown
    fn analyze(&self, word: &str, language: &str) -> Result<Vec<(String, f32)>, Cg3Error>;
}

/// Disambiguator consuming a reading stream and producing cohort text
pub trait Disambiguator {
    fn run(&self, stream: &str) -> Result<String, Cg3Error>;
}

/// Encode analyses as a reading stream
///
/// `analyses[i]` holds the readings of `words[i]`; a missing or empty entry
/// marks the word as unknown. With `ignore_after`, each reading is cut at
/// the first occurrence of the marker.
pub fn reading_stream<S: AsRef<str>>(
    words: &[S],
    analyses: &[Vec<(String, f32)>],
    ignore_after: Option<&str>,
) -> String {
    let mut stream = String::new();

    for (i, word) in words.iter().enumerate() {
        let word = word.as_ref();
        let readings = analyses.get(i).map(Vec::as_slice).unwrap_or_default();

        if readings.is_empty() {
            stream.push_str(&format!("{word}\t{word}{UNKNOWN_TAG}\tinf\n"));
        }
        for (reading, weight) in readings {
            let reading = match ignore_after {
                Some(marker) => reading.split(marker).next().unwrap_or_default(),
                None => reading.as_str(),
            };
            stream.push_str(&format!("{word}\t{reading}\t{weight}\n"));
        }
        stream.push('\n');
    }

    stream
}

/// Decode disambiguator output into one cohort of readings per word
pub fn parse_cohorts(output: &str) -> Vec<Vec<Cg3Word>> {
    let mut cohorts = Vec::new();
    let mut current: Option<(&str, Vec<Cg3Word>)> = None;

    for line in output.lines() {
        if let Some(form) = line.strip_prefix("\"<").and_then(|rest| rest.strip_suffix(">\"")) {
            if let Some((_, readings)) = current.take() {
                cohorts.push(readings);
            }
            current = Some((form, Vec::new()));
            continue;
        }

        let Some((form, readings)) = current.as_mut() else {
            continue;
        };
        let Some(reading) = line.strip_prefix('\t') else {
            continue;
        };
        let Some((lemma, tags)) = reading
            .trim_start_matches('\t')
            .strip_prefix('"')
            .and_then(|rest| rest.split_once("\" "))
        else {
            continue;
        };

        let morphology = tags.split(' ').filter(|tag| !tag.is_empty()).map(String::from).collect();
        readings.push(Cg3Word::new(*form, lemma, morphology));
    }

    if let Some((_, readings)) = current {
        cohorts.push(readings);
    }
    cohorts
}

/// Analyze-then-disambiguate pipeline for one language
pub struct Cg3<A, D> {
    analyzer: A,
    disambiguator: D,
    language: String,
    ignore_after: Option<String>,
}

impl<A: Analyzer, D: Disambiguator> Cg3<A, D> {
    pub fn new(analyzer: A, disambiguator: D, language: impl Into<String>) -> Self {
        Self {
            analyzer,
            disambiguator,
            language: language.into(),
            ignore_after: None,
        }
    }

    /// Cut every reading at the first occurrence of `marker`
    pub fn ignore_after(mut self, marker: impl Into<String>) -> Self {
        self.ignore_after = Some(marker.into());
        self
    }

    /// Disambiguate a tokenized sentence
    pub fn disambiguate<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<Vec<Cg3Word>>, Cg3Error> {
        let analyses = words
            .iter()
            .map(|word| self.analyzer.analyze(word.as_ref(), &self.language))
            .collect::<Result<Vec<_>, _>>()?;

        self.disambiguate_with(words, &analyses)
    }

    /// Disambiguate using analyses supplied by the caller
    pub fn disambiguate_with<S: AsRef<str>>(
        &self,
        words: &[S],
        analyses: &[Vec<(String, f32)>],
    ) -> Result<Vec<Vec<Cg3Word>>, Cg3Error> {
        let stream = reading_stream(words, analyses, self.ignore_after.as_deref());
        let output = self.disambiguator.run(&stream)?;
        let cohorts = parse_cohorts(&output);

        debug!(
            words = words.len(),
            cohorts = cohorts.len(),
            language = %self.language,
            "disambiguated"
        );
        Ok(cohorts)
    }
}
