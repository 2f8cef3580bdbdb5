use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ccgchart::oracle::{SupertagOracle, TaggedWord, parse_supertagged};
use ccgchart::{Grammar, Parser, ParserConfig};

const GRAMMAR_SRC: &str = r#"
  120 # NP --> NP[nb]/N N
  80 # S[dcl] --> NP S[dcl]\NP
  40 # S[dcl]\NP --> (S[dcl]\NP)/NP NP
  30 # S[dcl] --> S[dcl] .
  25 # NP --> N
  20 # N --> N/N N
  15 # NP\NP --> (NP\NP)/NP NP
  15 # NP --> NP NP\NP
  12 # S/(S\NP) --> NP
  12 # S[dcl]/NP --> S/(S\NP) (S[dcl]\NP)/NP
"#;

const SIMPLE: &str = r"The|NP[nb]/N|0.9|N/N|0.1 cat|N saw|(S[dcl]\NP)/NP|0.8|N|0.2 mice|N .|.";
const AMBIGUOUS: &str = r"The|NP[nb]/N old|N/N|0.6|N|0.4 cat|N saw|(S[dcl]\NP)/NP|0.7|N|0.3 mice|N|0.8|N/N|0.2 with|(NP\NP)/NP|0.9|N|0.1 big|N/N|0.7|N|0.3 tails|N .|.";

fn parse(parser: &Parser<'_>, words: &[&str], oracle: &SupertagOracle) -> usize {
  parser.parse(words, oracle).map(|chart| chart.stats().categories).unwrap_or(0)
}

fn criterion_benchmark(c: &mut Criterion) {
  let mut grammar = GRAMMAR_SRC.parse::<Grammar>().unwrap();
  let simple = parse_supertagged(SIMPLE).unwrap();
  let ambiguous = parse_supertagged(AMBIGUOUS).unwrap();
  grammar.extend_vocab(
    simple
      .iter()
      .chain(ambiguous.iter())
      .flat_map(|w| w.tags.iter().map(|(cat, _)| cat.as_str())),
  );

  let parser = Parser::new(&grammar, ParserConfig::default());
  let words = |tagged: &[TaggedWord]| tagged.iter().map(|w| w.word.clone()).collect::<Vec<_>>();

  let simple_words = words(&simple);
  let simple_words = simple_words.iter().map(String::as_str).collect::<Vec<_>>();
  let simple_oracle = SupertagOracle::new(&simple, grammar.vocab()).unwrap();

  let ambiguous_words = words(&ambiguous);
  let ambiguous_words = ambiguous_words.iter().map(String::as_str).collect::<Vec<_>>();
  let ambiguous_oracle = SupertagOracle::new(&ambiguous, grammar.vocab()).unwrap();

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(black_box(&parser), black_box(&simple_words), &simple_oracle))
  });

  c.bench_function("parse ambiguous", |b| {
    b.iter(|| parse(black_box(&parser), black_box(&ambiguous_words), &ambiguous_oracle))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
