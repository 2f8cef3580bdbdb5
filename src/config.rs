use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::utils::Err;

/// Search-space controls for a [`crate::parser::Parser`]. Every probability is compared with
/// a strict `>`: a candidate exactly at the threshold is dropped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
  /// Minimum supertag probability for leaf categories past the top one
  pub stag_threshold: f64,
  /// Minimum phrase-label probability for a combination to be kept
  pub phrase_label_threshold: f64,
  /// Minimum span probability for a combination to be kept
  pub span_threshold: f64,
  /// Wall-clock budget per sentence; `None` never times out
  pub max_parse_seconds: Option<f64>,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self {
      stag_threshold: 0.1,
      phrase_label_threshold: 0.01,
      span_threshold: 0.05,
      max_parse_seconds: Some(60.0),
    }
  }
}

impl ParserConfig {
  /// Reads a JSON object; missing fields keep their defaults
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let s = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
  }

  /// The budget as a `Duration`. Negative or non-finite budgets mean no budget at all.
  pub fn max_parse_time(&self) -> Option<Duration> {
    self
      .max_parse_seconds
      .and_then(|s| Duration::try_from_secs_f64(s).ok())
  }
}

#[test]
fn test_config_defaults_and_overrides() {
  let config: ParserConfig = serde_json::from_str("{}").unwrap();
  assert_eq!(config, ParserConfig::default());
  assert_eq!(config.max_parse_time(), Some(Duration::from_secs(60)));

  let config: ParserConfig =
    serde_json::from_str(r#"{ "stag_threshold": 0.5, "max_parse_seconds": null }"#).unwrap();
  assert_eq!(config.stag_threshold, 0.5);
  assert_eq!(config.span_threshold, 0.05);
  assert_eq!(config.max_parse_time(), None);

  assert!(serde_json::from_str::<ParserConfig>(r#"{ "beam": 4 }"#).is_err());
}
