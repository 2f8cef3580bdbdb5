use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ccgchart::batch::{Decoded, parse_batch};
use ccgchart::grammar::DEFAULT_MIN_FREQ;
use ccgchart::oracle::{HolographicModel, HolographicOracle, SupertagOracle, TaggedWord, parse_supertagged};
use ccgchart::{Err, Grammar, OracleError, Parser, ParserConfig};

/// Parses sentences with a CCG chart parser and prints AUTO derivations.
///
/// Without --model every input line is a supertagged sentence, `word|CAT` or
/// `word|CAT|p|CAT|p...` per token. With --model every line is a plain tokenized sentence
/// scored by the model.
#[derive(ClapParser)]
#[clap(author, version, about, long_about = None)]
struct Args {
  /// Rule-frequency file
  #[clap(short, long)]
  grammar: PathBuf,

  /// Head-statistics file
  #[clap(long)]
  heads: Option<PathBuf>,

  /// Drop rules seen fewer times than this
  #[clap(long, default_value_t = DEFAULT_MIN_FREQ)]
  min_freq: u64,

  /// JSON file with parser settings; flags override it
  #[clap(short, long)]
  config: Option<PathBuf>,

  /// JSON embedding model to score plain sentences with
  #[clap(short, long)]
  model: Option<PathBuf>,

  #[clap(long)]
  stag_threshold: Option<f64>,

  #[clap(long)]
  phrase_threshold: Option<f64>,

  #[clap(long)]
  span_threshold: Option<f64>,

  /// Wall-clock budget per sentence, in seconds
  #[clap(long, conflicts_with = "no_budget")]
  max_parse_seconds: Option<f64>,

  /// Never give up on a sentence
  #[clap(long)]
  no_budget: bool,

  /// Span probability used when parsing from supertags alone
  #[clap(long, default_value_t = 1.0)]
  span_prob: f64,

  /// Print nothing for sentences without a full derivation instead of skimming
  #[clap(long)]
  no_skim: bool,

  /// Also print each derivation as an indented tree
  #[clap(short, long)]
  tree: bool,

  /// Print each chart to stderr
  #[clap(long)]
  chart: bool,

  /// Input file; stdin if missing
  input: Option<PathBuf>,
}

impl Args {
  fn parser_config(&self) -> Result<ParserConfig, Err> {
    let mut config = match &self.config {
      Some(path) => ParserConfig::from_json_file(path)?,
      None => ParserConfig::default(),
    };
    if let Some(t) = self.stag_threshold {
      config.stag_threshold = t;
    }
    if let Some(t) = self.phrase_threshold {
      config.phrase_label_threshold = t;
    }
    if let Some(t) = self.span_threshold {
      config.span_threshold = t;
    }
    if self.no_budget {
      config.max_parse_seconds = None;
    } else if let Some(s) = self.max_parse_seconds {
      config.max_parse_seconds = Some(s);
    }
    Ok(config)
  }

  fn read_input(&self) -> Result<String, Err> {
    Ok(match &self.input {
      Some(path) => fs::read_to_string(path)?,
      None => {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        s
      }
    })
  }
}

fn print_entries(entries: &[ccgchart::BatchEntry], tree: bool) -> Result<(), Err> {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  for entry in entries {
    write!(out, "{}", entry)?;
    if !tree {
      continue;
    }
    let derivations = match &entry.result {
      Ok(Decoded::Full(d)) => vec![d],
      Ok(Decoded::Skimmed(ds)) => ds.iter().collect(),
      _ => Vec::new(),
    };
    for d in derivations {
      if let Some(t) = d.to_syntree() {
        writeln!(out, "{}\n", t)?;
      }
    }
  }
  Ok(())
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();
  let config = args.parser_config()?;
  let input = args.read_input()?;
  let lines = input.lines().map(str::trim).collect::<Vec<_>>();

  let mut grammar = Grammar::read_from_file(&args.grammar, args.min_freq)?;
  if let Some(heads) = &args.heads {
    grammar.read_heads_from_file(heads)?;
  }

  let print_chart = |id: usize, chart: &ccgchart::Chart<'_>| {
    if args.chart {
      eprintln!("chart {} ({}):\n{}", id, chart.stats(), chart);
    }
  };

  let entries = match &args.model {
    Some(path) => {
      let model = HolographicModel::from_json_file(path)?;
      grammar.extend_vocab(model.labels());
      let oracle = HolographicOracle::from_model(model, grammar.vocab())?;
      info!(path = %path.display(), labels = grammar.vocab().len(), "loaded model");

      let parser = Parser::new(&grammar, config);
      parse_batch(&parser, &lines, !args.no_skim, |_, _| Ok(&oracle), print_chart)
    }
    None => {
      // a bad line only fails its own sentence
      let tagged = lines
        .iter()
        .map(|line| parse_supertagged(line))
        .collect::<Vec<Result<Vec<TaggedWord>, OracleError>>>();
      grammar.extend_vocab(
        tagged
          .iter()
          .flatten()
          .flatten()
          .flat_map(|w| w.tags.iter().map(|(cat, _)| cat.as_str())),
      );
      let sentences = lines
        .iter()
        .map(|line| {
          line
            .split_whitespace()
            .map(|token| token.split('|').next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
        })
        .collect::<Vec<_>>();

      let parser = Parser::new(&grammar, config);
      parse_batch(
        &parser,
        &sentences,
        !args.no_skim,
        |idx, _| {
          let words = tagged[idx].as_ref().map_err(Clone::clone)?;
          SupertagOracle::new(words, grammar.vocab())?.with_span_prob(args.span_prob)
        },
        print_chart,
      )
    }
  };

  print_entries(&entries, args.tree)
}
