//! CoNLL-U serialization
//!
//! A sentence is written as its comment lines followed by one line per
//! token in canonical order. The DEPS column is rebuilt from the node's
//! relations: secondary heads plus the primary one, sorted and joined
//! with `|`.

use crate::conllu::PLACEHOLDER;
use crate::order::{sort_nodes, sort_relations};
use crate::tree::{NodeRef, RelationRef, Sentence};
use std::fmt;

impl<'a> NodeRef<'a> {
    /// Relations written to the DEPS column, in canonical order
    pub fn enhanced_relations(self) -> Vec<RelationRef<'a>> {
        let node = self.node();
        let mut relations: Vec<RelationRef<'a>> = self
            .secondary_heads()
            .filter(|relation| relation.relation().head != self.index())
            .collect();

        if let Some(primary) = self.head() {
            if !node.implicit_head {
                relations.push(primary);
            }
        }

        sort_relations(&mut relations);
        relations.dedup();
        relations
    }

    /// The DEPS column; `_` when there are no relations to write
    pub fn deps(self) -> String {
        let relations = self.enhanced_relations();
        if relations.is_empty() {
            return PLACEHOLDER.to_string();
        }

        relations
            .iter()
            .map(|relation| relation.to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// One CoNLL-U line, without the newline
impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node();
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t",
            node.id, node.form, node.lemma, node.upos, node.xpos, node.feats
        )?;

        match self.head() {
            None if node.is_range() => write!(f, "{}\t{}", PLACEHOLDER, PLACEHOLDER)?,
            None => f.write_str("0\troot")?,
            Some(_) if node.implicit_head => write!(f, "{}\t{}", PLACEHOLDER, PLACEHOLDER)?,
            Some(relation) => write!(f, "{}\t{}", relation.head().id, relation.label())?,
        }

        write!(f, "\t{}\t{}", self.deps(), node.misc)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.comments)?;

        let mut tokens = self.tokens();
        sort_nodes(&mut tokens);
        for token in tokens {
            writeln!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl Sentence {
    /// Serialize back to CoNLL-U
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::conllu::parse_sentence;
    use proptest::prelude::*;

    #[test]
    fn test_single_line() {
        let line = "1\tcats\tcat\tNOUN\tN\tNumber=Plur\t0\troot\t0:root\t_";
        let sentence = parse_sentence(line).unwrap();

        assert_eq!(sentence.root().unwrap().to_string(), line);
        assert_eq!(sentence.to_text(), format!("{}\n", line));
    }

    #[test]
    fn test_empty_deps_column_gets_primary() {
        let sentence = parse_sentence("1\tcats\tcat\tNOUN\tN\tNumber=Plur\t0\troot\t_\t_").unwrap();

        assert_eq!(
            sentence.to_text(),
            "1\tcats\tcat\tNOUN\tN\tNumber=Plur\t0\troot\t0:root\t_\n"
        );
    }

    #[test]
    fn test_round_trip_basic() {
        let conllu = "# sent_id = 1\n\
                      # text = The dog runs.\n\
                      1\tThe\tthe\tDET\tDT\tDefinite=Def\t2\tdet\t2:det\t_\n\
                      2\tdog\tdog\tNOUN\tNN\tNumber=Sing\t3\tnsubj\t3:nsubj\t_\n\
                      3\truns\trun\tVERB\tVBZ\t_\t0\troot\t0:root\tSpaceAfter=No\n\
                      4\t.\t.\tPUNCT\t.\t_\t3\tpunct\t3:punct\t_\n";

        let sentence = parse_sentence(conllu).unwrap();
        let text = sentence.to_text();

        assert_eq!(text, conllu);
        assert_eq!(parse_sentence(&text).unwrap().to_text(), text);
    }

    #[test]
    fn test_round_trip_ranges_and_empty_nodes() {
        let conllu = "1-2\tvámonos\t_\t_\t_\t_\t_\t_\t_\t_\n\
                      1\tvamos\tir\tVERB\t_\t_\t0\troot\t0:root\t_\n\
                      2\tnos\tnosotros\tPRON\t_\t_\t1\tobj\t1:obj\t_\n\
                      2.1\tvamos\tir\tVERB\t_\t_\t_\t_\t0:root\t_\n\
                      3\t!\t!\tPUNCT\t_\t_\t1\tpunct\t1:punct\t_\n";

        let sentence = parse_sentence(conllu).unwrap();
        assert_eq!(sentence.to_text(), conllu);
    }

    #[test]
    fn test_deps_are_canonicalized() {
        let conllu = "1\tcats\tcat\tNOUN\t_\t_\t3\tnsubj\t4:nsubj|3:nsubj\t_\n\
                      2\tand\tand\tCCONJ\t_\t_\t4\tcc\t4:cc\t_\n\
                      3\tsleep\tsleep\tVERB\t_\t_\t0\troot\t0:root\t_\n\
                      4\tdream\tdream\tVERB\t_\t_\t3\tconj\t3:conj\t_\n";

        let sentence = parse_sentence(conllu).unwrap();
        let cats = sentence.node_by_id("1").unwrap();

        assert_eq!(cats.deps(), "3:nsubj|4:nsubj");
        assert_eq!(
            cats.to_string(),
            "1\tcats\tcat\tNOUN\t_\t_\t3\tnsubj\t3:nsubj|4:nsubj\t_"
        );
    }

    #[test]
    fn test_deps_ordering_with_empty_node_heads() {
        let conllu = "1\ta\ta\tX\t_\t_\t0\troot\t0:root\t_\n\
                      1.1\tb\tb\tX\t_\t_\t_\t_\t1:dep\t_\n\
                      2\tc\tc\tX\t_\t_\t1\tdep\t1.1:dep|2:self|1:dep\t_\n";

        let sentence = parse_sentence(conllu).unwrap();
        let c = sentence.node_by_id("2").unwrap();

        // self-loops stay out of DEPS
        assert_eq!(c.deps(), "1:dep|1.1:dep");
    }

    fn sentence_text() -> impl Strategy<Value = String> {
        (1usize..8)
            .prop_flat_map(|n| {
                let heads: Vec<_> = (1..=n).map(|i| 0..i).collect();
                let tags = proptest::collection::vec(
                    prop::sample::select(vec!["NOUN", "VERB", "ADJ", "ADP"]),
                    n,
                );
                (heads, tags)
            })
            .prop_map(|(heads, tags)| {
                let mut text = String::from("# generated\n");
                for (i, (head, tag)) in heads.iter().zip(&tags).enumerate() {
                    let deprel = if *head == 0 { "root" } else { "dep" };
                    text.push_str(&format!(
                        "{id}\tw{id}\tl{id}\t{tag}\t_\t_\t{head}\t{deprel}\t{head}:{deprel}\t_\n",
                        id = i + 1,
                    ));
                }
                text
            })
    }

    proptest! {
        #[test]
        fn test_round_trip_generated(text in sentence_text()) {
            let sentence = parse_sentence(&text).unwrap();
            let written = sentence.to_text();

            prop_assert_eq!(&written, &text);

            let reparsed = parse_sentence(&written).unwrap();
            prop_assert_eq!(reparsed.token_count(), sentence.token_count());
            prop_assert_eq!(reparsed.to_text(), written);
        }
    }
}
