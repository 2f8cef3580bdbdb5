//! The scoring oracle: everything numeric the chart needs but doesn't compute itself.
//!
//! The parser only ever asks four questions: what are the supertag probabilities for a word,
//! how likely is a vector to be a real constituent, what label does a constituent vector
//! carry, and what vector does a pair of adjacent constituents compose into. Anything that
//! can answer them, a neural model, a lookup table, a test mock, can drive the chart.

mod holographic;
mod supertag;

pub use holographic::{HolographicModel, HolographicOracle, Linear, circular_correlation};
pub use supertag::{SupertagOracle, TaggedWord, parse_supertagged};

use std::sync::Arc;

use logprob::LogProb;

use crate::error::OracleError;
use crate::vocab::Label;

/// Feature representation of a constituent. Immutable and shared between a category and the
/// unary parents built on top of it.
pub type Vector = Arc<[f32]>;

/// What the oracle says about a single word
#[derive(Debug, Clone)]
pub struct LeafScores {
  pub vector: Vector,
  pub distribution: Distribution,
}

pub trait ScoringOracle {
  /// Supertag distribution for `sentence[position]`. The whole sentence is the context.
  fn score_leaf(&self, sentence: &[&str], position: usize) -> Result<LeafScores, OracleError>;

  /// Probability that `vector` is a constituent
  fn score_span(&self, vector: &Vector) -> Result<f64, OracleError>;

  /// Distribution over phrase labels for `vector`
  fn score_phrase_label(&self, vector: &Vector) -> Result<Distribution, OracleError>;

  /// Vector for the span made by joining two adjacent constituents
  fn compose(&self, left: &Vector, right: &Vector) -> Result<Vector, OracleError>;
}

impl<T: ScoringOracle + ?Sized> ScoringOracle for &T {
  fn score_leaf(&self, sentence: &[&str], position: usize) -> Result<LeafScores, OracleError> {
    (**self).score_leaf(sentence, position)
  }

  fn score_span(&self, vector: &Vector) -> Result<f64, OracleError> {
    (**self).score_span(vector)
  }

  fn score_phrase_label(&self, vector: &Vector) -> Result<Distribution, OracleError> {
    (**self).score_phrase_label(vector)
  }

  fn compose(&self, left: &Vector, right: &Vector) -> Result<Vector, OracleError> {
    (**self).compose(left, right)
  }
}

/// Probabilities indexed by [`Label`]. Labels past the end have probability 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution(Vec<f64>);

impl Distribution {
  /// Checks that every entry is a probability
  pub fn new(probs: Vec<f64>) -> Result<Self, OracleError> {
    for &p in probs.iter() {
      check_probability("label probability", p)?;
    }
    Ok(Self(probs))
  }

  /// Builds a dense distribution of `len` labels out of sparse `(label, probability)` pairs.
  /// Repeated labels accumulate.
  pub fn from_pairs<I>(len: usize, pairs: I) -> Result<Self, OracleError>
  where
    I: IntoIterator<Item = (Label, f64)>,
  {
    let mut probs = vec![0.0; len];
    for (label, p) in pairs {
      let slot = probs
        .get_mut(label.index())
        .ok_or(OracleError::DimensionMismatch {
          expected: len,
          got: label.index() + 1,
        })?;
      *slot += p;
    }
    Self::new(probs)
  }

  pub fn prob(&self, label: Label) -> f64 {
    self.0.get(label.index()).copied().unwrap_or(0.0)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Every label except `<unk>`, most probable first. Equal probabilities keep label order.
  pub fn ranked(&self) -> Vec<(Label, f64)> {
    let mut ranked = self
      .0
      .iter()
      .enumerate()
      .map(|(idx, p)| (Label(idx as u32), *p))
      .filter(|(label, _)| !label.is_unknown())
      .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
  }
}

/// Validates `p` and moves it to log space
pub fn log_prob(what: &'static str, p: f64) -> Result<f64, OracleError> {
  check_probability(what, p)?;
  LogProb::from_raw_prob(p)
    .map(LogProb::into_inner)
    .map_err(|_| OracleError::InvalidProbability { what, value: p })
}

fn check_probability(what: &'static str, p: f64) -> Result<(), OracleError> {
  if p.is_nan() || !(0.0..=1.0).contains(&p) {
    Err(OracleError::InvalidProbability { what, value: p })
  } else {
    Ok(())
  }
}

/// Logistic function, for oracles whose span scorer produces a logit
pub fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over raw classifier scores
pub fn softmax(scores: &[f64]) -> Vec<f64> {
  let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let exps = scores.iter().map(|s| (s - max).exp()).collect::<Vec<_>>();
  let total: f64 = exps.iter().sum();
  exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn test_distribution_validation() {
    assert!(Distribution::new(vec![0.0, 0.5, 0.5]).is_ok());
    assert!(matches!(
      Distribution::new(vec![0.0, 1.5]),
      Err(OracleError::InvalidProbability { value, .. }) if value == 1.5
    ));
    assert!(Distribution::new(vec![f64::NAN]).is_err());
    assert!(Distribution::new(vec![-0.1]).is_err());
  }

  #[test]
  fn test_from_pairs() {
    let d = Distribution::from_pairs(4, [(Label(2), 0.25), (Label(2), 0.25), (Label(3), 0.5)]).unwrap();
    assert_eq!(d.prob(Label(2)), 0.5);
    assert_eq!(d.prob(Label(1)), 0.0);
    assert_eq!(d.prob(Label(40)), 0.0);
    assert!(Distribution::from_pairs(2, [(Label(5), 0.1)]).is_err());
  }

  #[test]
  fn test_ranked_skips_unknown() {
    let d = Distribution::new(vec![0.9, 0.02, 0.05, 0.03]).unwrap();
    let ranked = d.ranked();
    assert_eq!(
      ranked.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
      vec![Label(2), Label(3), Label(1)]
    );
  }

  #[test]
  fn test_log_prob() {
    assert_relative_eq!(log_prob("p", 1.0).unwrap(), 0.0);
    assert_relative_eq!(log_prob("p", 0.5).unwrap(), 0.5f64.ln());
    assert!(log_prob("p", 0.0).unwrap().is_infinite());
    assert!(log_prob("p", 2.0).is_err());
  }

  #[test]
  fn test_softmax_and_sigmoid() {
    let p = softmax(&[1.0, 1.0, 1000.0]);
    assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(p[2], 1.0, epsilon = 1e-12);
    assert_relative_eq!(sigmoid(0.0), 0.5);
  }
}
