use std::sync::Arc;

use tracing::warn;

use super::{Distribution, LeafScores, ScoringOracle, Vector};
use crate::error::OracleError;
use crate::vocab::Vocab;

/// A word and the supertags some external tagger proposed for it
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedWord {
  pub word: String,
  pub tags: Vec<(String, f64)>,
}

impl TaggedWord {
  /// Parses `word|CAT` (probability 1) or `word|CAT|p|CAT|p...`
  pub fn parse(token: &str) -> Result<Self, OracleError> {
    let mut fields = token.split('|');
    let word = fields.next().unwrap_or_default().to_string();
    let rest = fields.collect::<Vec<_>>();

    let tags = match rest.as_slice() {
      [] => return Err(OracleError::Model(format!("no supertag for '{}'", token))),
      [cat] => vec![(cat.to_string(), 1.0)],
      pairs if pairs.len() % 2 == 0 => pairs
        .chunks(2)
        .map(|pair| {
          pair[1]
            .parse::<f64>()
            .map(|p| (pair[0].to_string(), p))
            .map_err(|_| OracleError::Model(format!("bad probability '{}' in '{}'", pair[1], token)))
        })
        .collect::<Result<Vec<_>, _>>()?,
      _ => {
        return Err(OracleError::Model(format!(
          "unpaired supertag field in '{}'",
          token
        )));
      }
    };

    Ok(Self { word, tags })
  }
}

/// Parses a whole supertagged sentence, tokens separated by whitespace
pub fn parse_supertagged(line: &str) -> Result<Vec<TaggedWord>, OracleError> {
  line.split_whitespace().map(TaggedWord::parse).collect()
}

/// Scores a sentence from supertags alone. Every span is a certain constituent and every
/// phrase label certain, so a derivation's score is the sum of its supertag log-probabilities
/// and the grammar decides everything else.
#[derive(Debug, Clone)]
pub struct SupertagOracle {
  leaves: Vec<Distribution>,
  phrases: Distribution,
  span_prob: f64,
  empty: Vector,
}

impl SupertagOracle {
  /// Supertags the vocabulary doesn't know are folded into `<unk>`, which the parser never uses
  pub fn new(words: &[TaggedWord], vocab: &Vocab) -> Result<Self, OracleError> {
    let leaves = words
      .iter()
      .map(|w| {
        let pairs = w.tags.iter().map(|(cat, p)| {
          let label = vocab.get(cat);
          if label.is_unknown() {
            warn!(word = %w.word, supertag = %cat, "supertag not in vocabulary");
          }
          (label, *p)
        });
        Distribution::from_pairs(vocab.len(), pairs)
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      leaves,
      phrases: Distribution::new(vec![1.0; vocab.len()])?,
      span_prob: 1.0,
      empty: Arc::from(Vec::new()),
    })
  }

  /// Scores every span with `p` instead of 1, penalizing derivations with many constituents
  pub fn with_span_prob(mut self, p: f64) -> Result<Self, OracleError> {
    super::log_prob("span probability", p)?;
    self.span_prob = p;
    Ok(self)
  }
}

impl ScoringOracle for SupertagOracle {
  fn score_leaf(&self, sentence: &[&str], position: usize) -> Result<LeafScores, OracleError> {
    let distribution = self
      .leaves
      .get(position)
      .ok_or(OracleError::MissingPosition {
        position,
        len: sentence.len(),
      })?
      .clone();
    Ok(LeafScores {
      vector: self.empty.clone(),
      distribution,
    })
  }

  fn score_span(&self, _vector: &Vector) -> Result<f64, OracleError> {
    Ok(self.span_prob)
  }

  fn score_phrase_label(&self, _vector: &Vector) -> Result<Distribution, OracleError> {
    Ok(self.phrases.clone())
  }

  fn compose(&self, _left: &Vector, _right: &Vector) -> Result<Vector, OracleError> {
    Ok(self.empty.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_tokens() {
    assert_eq!(
      TaggedWord::parse("cat|N").unwrap(),
      TaggedWord {
        word: "cat".to_string(),
        tags: vec![("N".to_string(), 1.0)],
      }
    );
    let w = TaggedWord::parse(r"runs|S[dcl]\NP|0.75|N|0.25").unwrap();
    assert_eq!(w.tags.len(), 2);
    assert_eq!(w.tags[1], ("N".to_string(), 0.25));

    assert!(TaggedWord::parse("cat").is_err());
    assert!(TaggedWord::parse("cat|N|0.5|NP").is_err());
    assert!(TaggedWord::parse("cat|N|high|NP|0.1").is_err());
    assert_eq!(parse_supertagged("the|NP/N  cat|N").unwrap().len(), 2);
  }

  #[test]
  fn test_scores() {
    let mut vocab = Vocab::new();
    let n = vocab.intern("N");
    let np = vocab.intern("NP");
    let words = parse_supertagged("cat|N|0.75|NP|0.2|Xyz|0.05").unwrap();
    let oracle = SupertagOracle::new(&words, &vocab).unwrap();

    let leaf = oracle.score_leaf(&["cat"], 0).unwrap();
    assert_eq!(leaf.distribution.prob(n), 0.75);
    assert_eq!(leaf.distribution.prob(np), 0.2);
    assert_eq!(leaf.distribution.ranked()[0].0, n);
    assert!(oracle.score_leaf(&["cat"], 1).is_err());

    assert_eq!(oracle.score_span(&leaf.vector).unwrap(), 1.0);
    assert_eq!(oracle.score_phrase_label(&leaf.vector).unwrap().prob(np), 1.0);

    let oracle = oracle.with_span_prob(0.5).unwrap();
    assert_eq!(oracle.score_span(&leaf.vector).unwrap(), 0.5);
    assert!(SupertagOracle::new(&words, &vocab).unwrap().with_span_prob(3.0).is_err());
  }
}
