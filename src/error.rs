use std::sync::Arc;

use thiserror::Error;

use crate::chart::Span;

/// Errors raised while loading a grammar or its head statistics
#[derive(Debug, Error)]
pub enum GrammarError {
  #[error("couldn't read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// Every line was malformed, a comment, or below the frequency cutoff
  #[error("empty ruleset ({malformed} malformed lines, {below_min_freq} rules below min_freq {min_freq})")]
  Empty {
    malformed: usize,
    below_min_freq: usize,
    min_freq: u64,
  },

  #[error("head statistics line {line}: {message}")]
  HeadLine { line: usize, message: String },
}

/// Errors raised by a [`crate::oracle::ScoringOracle`]. Fatal for the sentence being parsed.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
  #[error("{what} is not a probability: {value}")]
  InvalidProbability { what: &'static str, value: f64 },

  #[error("dimension mismatch: expected {expected}, got {got}")]
  DimensionMismatch { expected: usize, got: usize },

  /// The distribution offers nothing except the reserved unknown label
  #[error("leaf distribution at position {position} has no label besides <unk>")]
  DegenerateLeaf { position: usize },

  #[error("no scores for position {position} in a sentence of {len} tokens")]
  MissingPosition { position: usize, len: usize },

  #[error("couldn't read model {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: Arc<std::io::Error>,
  },

  #[error("malformed model {path}: {source}")]
  Json {
    path: String,
    #[source]
    source: Arc<serde_json::Error>,
  },

  #[error("model: {0}")]
  Model(String),
}

/// Errors that abort the parse of a single sentence
#[derive(Debug, Clone, Error)]
pub enum ParseError {
  #[error("cannot parse an empty sentence")]
  EmptySentence,

  #[error("oracle failed at {span}: {source}")]
  Oracle {
    span: Span,
    #[source]
    source: OracleError,
  },

  /// Raised when a unary rule cycle keeps feeding the closure work-queue
  #[error("unary closure at {span} did not converge after {steps} steps")]
  UnaryClosureDiverged { span: Span, steps: usize },
}

impl ParseError {
  pub(crate) fn oracle(span: Span) -> impl FnOnce(OracleError) -> Self {
    move |source| Self::Oracle { span, source }
  }
}
