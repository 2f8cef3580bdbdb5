#[macro_use]
extern crate lazy_static;

pub mod batch;
pub mod chart;
pub mod config;
pub mod decode;
pub mod error;
pub mod grammar;
pub mod oracle;
pub mod parse_grammar;
pub mod parser;
pub mod rules;
pub mod skim;
pub mod syncat;
pub mod syntree;
pub mod utils;
pub mod vocab;

pub use crate::batch::{BatchEntry, Decoded, parse_batch, parse_sentence};
pub use crate::chart::{Category, Cell, Chart, Span};
pub use crate::config::ParserConfig;
pub use crate::decode::Derivation;
pub use crate::error::{GrammarError, OracleError, ParseError};
pub use crate::grammar::Grammar;
pub use crate::oracle::ScoringOracle;
pub use crate::parser::Parser;
pub use crate::utils::Err;

#[test]
fn test_supertagged_sentence_end_to_end() {
  use crate::oracle::{SupertagOracle, parse_supertagged};

  let mut g: Grammar = r#"
    # a toy grammar
    120 # NP --> NP[nb]/N N
    80 # S[dcl] --> NP S[dcl]\NP
    40 # S[dcl]\NP --> (S[dcl]\NP)/NP NP
    30 # S[dcl] --> S[dcl] .
    25 # NP --> N
  "#
  .parse()
  .unwrap();

  let tagged = parse_supertagged(
    r"The|NP[nb]/N|0.9|N/N|0.1 cat|N saw|(S[dcl]\NP)/NP|0.8|N|0.2 mice|N .|.",
  )
  .unwrap();
  g.extend_vocab(tagged.iter().flat_map(|w| w.tags.iter().map(|(cat, _)| cat.as_str())));
  let oracle = SupertagOracle::new(&tagged, g.vocab()).unwrap();
  let words = tagged.iter().map(|w| w.word.as_str()).collect::<Vec<_>>();

  let parser = Parser::new(&g, ParserConfig::default());
  let chart = parser.parse(&words, &oracle).unwrap();
  let derivation = chart.decode().unwrap();
  assert_eq!(derivation.span, Span::new(0, 5));
  assert_eq!(derivation.tokens[1], "S[dcl]");
  assert_eq!(
    derivation.to_string(),
    r"(<T S[dcl] 0 2> (<T S[dcl] 1 2> (<T NP 0 2> (<L NP[nb]/N POS POS The NP[nb]/N>) (<L N POS POS cat N>) ) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/NP POS POS saw (S[dcl]\NP)/NP>) (<T NP 0 1> (<L N POS POS mice N>) ) ) ) (<L . POS POS . .>) )"
  );

  let tree = derivation.to_syntree().unwrap();
  assert_eq!(tree.leaves().len(), 5);
}

#[test]
fn test_grammar_and_oracle_shared_across_threads() {
  use crate::oracle::{SupertagOracle, parse_supertagged};

  fn shareable<T: Send + Sync>() {}
  shareable::<Grammar>();
  shareable::<SupertagOracle>();
  shareable::<crate::oracle::HolographicOracle>();
  shareable::<Chart<'static>>();

  let mut g: Grammar = "10 # NP --> NP/N N\n10 # S --> NP S\\NP".parse().unwrap();
  let tagged = parse_supertagged(r"the|NP/N cat|N sleeps|S\NP").unwrap();
  g.extend_vocab(tagged.iter().flat_map(|w| w.tags.iter().map(|(cat, _)| cat.as_str())));
  let oracle = SupertagOracle::new(&tagged, g.vocab()).unwrap();
  let parser = Parser::new(&g, ParserConfig::default());
  let (parser, oracle) = (&parser, &oracle);

  let roots = std::thread::scope(|s| {
    let workers = [&["the", "cat"][..], &["the", "cat", "sleeps"][..]].map(|words| {
      s.spawn(move || {
        let chart = parser.parse(words, oracle).unwrap();
        chart.decode().map(|d| d.tokens[1].clone())
      })
    });
    workers.map(|w| w.join().unwrap())
  });
  assert_eq!(roots, [Some("NP".to_string()), Some("S".to_string())]);
}
