use std::fmt;

use tracing::{debug, warn};

use crate::chart::{Chart, Span};
use crate::decode::Derivation;
use crate::error::{OracleError, ParseError};
use crate::oracle::ScoringOracle;
use crate::parser::Parser;

/// What came out of one sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
  Full(Derivation),
  /// No derivation covers the sentence; the fragments cover it instead
  Skimmed(Vec<Derivation>),
  /// No derivation covers the sentence and skimming was off
  NoParse,
}

/// One sentence's output, numbered from 1
#[derive(Debug, Clone)]
pub struct BatchEntry {
  pub id: usize,
  pub result: Result<Decoded, ParseError>,
}

impl fmt::Display for BatchEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.result {
      Ok(Decoded::Full(d)) => {
        writeln!(f, "ID={} PARSER=TEST APPLY_SKIMMER=FALSE", self.id)?;
        writeln!(f, "{}", d)
      }
      Ok(Decoded::Skimmed(fragments)) => {
        for (k, d) in fragments.iter().enumerate() {
          writeln!(
            f,
            "ID={}.{} PARSER=TEST APPLY_SKIMMER=True SCOPE=({},{})",
            self.id, k, d.span.start, d.span.end
          )?;
          writeln!(f, "{}", d)?;
        }
        Ok(())
      }
      Ok(Decoded::NoParse) => Ok(()),
      Err(e) => writeln!(f, "ID={} PARSER=TEST ERROR={}", self.id, e),
    }
  }
}

/// Parses one sentence and decodes it, skimming when there's no full derivation
pub fn parse_sentence<O>(
  parser: &Parser<'_>,
  sentence: &[&str],
  oracle: &O,
  apply_skimmer: bool,
) -> Result<Decoded, ParseError>
where
  O: ScoringOracle + ?Sized,
{
  let chart = parser.parse(sentence, oracle)?;
  Ok(decode_chart(&chart, apply_skimmer))
}

/// The best full derivation, or the skimmed fragments if there is none
pub fn decode_chart(chart: &Chart<'_>, apply_skimmer: bool) -> Decoded {
  match chart.decode() {
    Some(d) => Decoded::Full(d),
    None if apply_skimmer => {
      debug!(tokens = chart.len(), "no full derivation, skimming");
      Decoded::Skimmed(chart.skim())
    }
    None => Decoded::NoParse,
  }
}

/// Parses each sentence with the oracle `oracle_for` builds for it, handing every finished
/// chart to `inspect` before decoding. A failure, whether building the oracle or parsing, is
/// recorded in that sentence's entry and the batch goes on.
pub fn parse_batch<S, O, F, I>(
  parser: &Parser<'_>,
  sentences: &[S],
  apply_skimmer: bool,
  mut oracle_for: F,
  mut inspect: I,
) -> Vec<BatchEntry>
where
  S: AsRef<str>,
  O: ScoringOracle,
  F: FnMut(usize, &[&str]) -> Result<O, OracleError>,
  I: FnMut(usize, &Chart<'_>),
{
  sentences
    .iter()
    .enumerate()
    .map(|(idx, sentence)| {
      let words = sentence.as_ref().split_whitespace().collect::<Vec<_>>();
      let result = if words.is_empty() {
        Err(ParseError::EmptySentence)
      } else {
        oracle_for(idx, &words)
          .map_err(ParseError::oracle(Span::new(0, words.len())))
          .and_then(|oracle| parser.parse(&words, &oracle))
          .map(|chart| {
            inspect(idx + 1, &chart);
            decode_chart(&chart, apply_skimmer)
          })
      };
      if let Err(e) = &result {
        warn!(id = idx + 1, error = %e, "sentence failed");
      }
      BatchEntry {
        id: idx + 1,
        result,
      }
    })
    .collect()
}
