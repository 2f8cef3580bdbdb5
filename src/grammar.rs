use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ahash::HashMap;
use tracing::{info, warn};

use crate::error::GrammarError;
use crate::parse_grammar::{RuleLine, parse_head_line, parse_rule_line};
use crate::rules::{Combinator, Production, Rule};
use crate::vocab::{Label, Vocab};

/// Rules seen fewer times than this in the treebank are dropped unless told otherwise
pub const DEFAULT_MIN_FREQ: u64 = 10;

/// Tally of what happened to each line while loading a rule file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub binary: usize,
  pub unary: usize,
  pub below_min_freq: usize,
  pub malformed: usize,
  pub duplicates: usize,
}

/// The combinator table: which parents each label pair (or single label) licenses, and which
/// child heads each binary rule. Immutable once parsing starts, so it can be shared by
/// reference between any number of parsers.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
  vocab: Vocab,
  binary: HashMap<(Label, Label), Vec<Production>>,
  unary: HashMap<Label, Vec<Production>>,
  heads: HashMap<(Label, Label, Label), usize>,
  report: LoadReport,
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** labels: {}", self.vocab.len())?;
    writeln!(
      f,
      "//** binary: {}, unary: {}",
      self.report.binary, self.report.unary
    )?;

    let mut binary = self.binary.iter().collect::<Vec<_>>();
    binary.sort_by_key(|(key, _)| **key);
    for ((left, right), prods) in binary {
      for p in prods {
        writeln!(
          f,
          "{} --> {} {}\t{}",
          self.name(p.parent),
          self.name(*left),
          self.name(*right),
          p.combinator
        )?;
      }
    }

    let mut unary = self.unary.iter().collect::<Vec<_>>();
    unary.sort_by_key(|(key, _)| **key);
    for (child, prods) in unary {
      for p in prods {
        writeln!(
          f,
          "{} --> {}\t{}",
          self.name(p.parent),
          self.name(*child),
          p.combinator
        )?;
      }
    }

    Ok(())
  }
}

impl Grammar {
  pub fn new() -> Self {
    Default::default()
  }

  /// Builds a grammar out of already-parsed rules, dropping the ones below `min_freq`
  pub fn from_rules<I>(rules: I, min_freq: u64) -> Self
  where
    I: IntoIterator<Item = Rule>,
  {
    let mut g = Self::new();
    for rule in rules {
      if rule.freq() < min_freq {
        g.report.below_min_freq += 1;
      } else {
        g.add_rule(&rule);
      }
    }
    g
  }

  /// Parses a rule file, skipping malformed lines and rules seen fewer than `min_freq` times
  pub fn parse_with_min_freq(s: &str, min_freq: u64) -> Result<Self, GrammarError> {
    let mut g = Self::new();

    for (idx, line) in s.lines().enumerate() {
      match parse_rule_line(line) {
        RuleLine::Rule(rule) if rule.freq() < min_freq => g.report.below_min_freq += 1,
        RuleLine::Rule(rule) => g.add_rule(&rule),
        RuleLine::Skip => {}
        RuleLine::Malformed(reason) => {
          warn!(line = idx + 1, %reason, "skipping malformed grammar line");
          g.report.malformed += 1;
        }
      }
    }

    if g.binary.is_empty() && g.unary.is_empty() {
      return Err(GrammarError::Empty {
        malformed: g.report.malformed,
        below_min_freq: g.report.below_min_freq,
        min_freq,
      });
    }

    info!(
      binary = g.report.binary,
      unary = g.report.unary,
      below_min_freq = g.report.below_min_freq,
      malformed = g.report.malformed,
      labels = g.vocab.len(),
      "loaded grammar"
    );
    Ok(g)
  }

  pub fn read_from_file(path: impl AsRef<Path>, min_freq: u64) -> Result<Self, GrammarError> {
    Self::parse_with_min_freq(&read(path.as_ref())?, min_freq)
  }

  /// Adds a rule, classifying its combinator. Repeats of a rule already in the table are
  /// counted but not stored twice.
  pub fn add_rule(&mut self, rule: &Rule) {
    let combinator = rule.combinator();
    let parent = self.vocab.intern(rule.parent());
    let production = Production::new(parent, combinator);

    let (prods, counter) = match rule {
      Rule::Binary { left, right, .. } => {
        let key = (self.vocab.intern(left), self.vocab.intern(right));
        (self.binary.entry(key).or_default(), &mut self.report.binary)
      }
      Rule::Unary { child, .. } => {
        let key = self.vocab.intern(child);
        (self.unary.entry(key).or_default(), &mut self.report.unary)
      }
    };

    if prods.iter().any(|p| p.parent == parent) {
      self.report.duplicates += 1;
    } else {
      prods.push(production);
      *counter += 1;
    }
  }

  /// Loads head statistics, returning how many entries were recorded. Entries for rules the
  /// grammar doesn't have are still kept; they're harmless.
  pub fn load_heads(&mut self, s: &str) -> Result<usize, GrammarError> {
    let mut n = 0;
    for (idx, line) in s.lines().enumerate() {
      let entry = parse_head_line(line).map_err(|message| GrammarError::HeadLine {
        line: idx + 1,
        message,
      })?;
      if let Some(entry) = entry {
        let key = (
          self.vocab.intern(&entry.left),
          self.vocab.intern(&entry.right),
          self.vocab.intern(&entry.parent),
        );
        self.heads.insert(key, entry.head);
        n += 1;
      }
    }
    info!(entries = n, "loaded head statistics");
    Ok(n)
  }

  pub fn read_heads_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize, GrammarError> {
    let s = read(path.as_ref())?;
    self.load_heads(&s)
  }

  /// Adds labels that only ever show up as supertags, so that the oracle can score them
  pub fn extend_vocab<'a, I>(&mut self, names: I)
  where
    I: IntoIterator<Item = &'a str>,
  {
    for name in names {
      self.vocab.intern(name);
    }
  }

  pub fn binary_productions(&self, left: Label, right: Label) -> Option<&[Production]> {
    self.binary.get(&(left, right)).map(Vec::as_slice)
  }

  pub fn unary_productions(&self, child: Label) -> Option<&[Production]> {
    self.unary.get(&child).map(Vec::as_slice)
  }

  /// The head child for a binary rule: from the statistics if there are any, otherwise
  /// whatever the combinator implies
  pub fn head(&self, left: Label, right: Label, parent: Label, combinator: Combinator) -> usize {
    self
      .heads
      .get(&(left, right, parent))
      .copied()
      .unwrap_or_else(|| combinator.default_head())
  }

  pub fn vocab(&self) -> &Vocab {
    &self.vocab
  }

  pub fn label(&self, name: &str) -> Label {
    self.vocab.get(name)
  }

  pub fn name(&self, label: Label) -> &str {
    self.vocab.name(label)
  }

  pub fn report(&self) -> &LoadReport {
    &self.report
  }
}

fn read(path: &Path) -> Result<String, GrammarError> {
  fs::read_to_string(path).map_err(|source| GrammarError::Io {
    path: path.display().to_string(),
    source,
  })
}

impl FromStr for Grammar {
  type Err = GrammarError;

  /// Parses a rule file with [`DEFAULT_MIN_FREQ`]
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse_with_min_freq(s, DEFAULT_MIN_FREQ)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RULES: &str = r#"
    # toy grammar
    1708 # NP --> NP[nb]/N N
    950 # S[dcl] --> NP S[dcl]\NP
    950 # S[dcl] --> NP S[dcl]\NP
    40 # S[dcl] --> NP S[dcl]\NP[conj]
    300 # NP --> N
    3 # NP --> N N
    this line is garbage
    12 # S/(S\NP) --> NP
  "#;

  #[test]
  fn test_load_rules() {
    let g: Grammar = RULES.parse().unwrap();
    let report = g.report();
    assert_eq!(report.binary, 3);
    assert_eq!(report.unary, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.below_min_freq, 1);
    assert_eq!(report.malformed, 1);

    let prods = g
      .binary_productions(g.label("NP[nb]/N"), g.label("N"))
      .unwrap();
    assert_eq!(
      prods,
      &[Production::new(g.label("NP"), Combinator::ForwardApplication)]
    );

    let prods = g.unary_productions(g.label("NP")).unwrap();
    assert_eq!(prods[0].combinator, Combinator::TypeRaising);
    assert!(g.binary_productions(g.label("N"), g.label("N")).is_none());
  }

  #[test]
  fn test_min_freq() {
    let g = Grammar::parse_with_min_freq(RULES, 1).unwrap();
    assert!(g.binary_productions(g.label("N"), g.label("N")).is_some());
    assert_eq!(g.report().below_min_freq, 0);

    let err = Grammar::parse_with_min_freq(RULES, 100_000).unwrap_err();
    assert!(matches!(err, GrammarError::Empty { .. }));
  }

  #[test]
  fn test_heads() {
    let mut g: Grammar = RULES.parse().unwrap();
    let (np, vp, s) = (g.label("NP"), g.label(r"S[dcl]\NP"), g.label("S[dcl]"));
    let (det, n) = (g.label("NP[nb]/N"), g.label("N"));

    // combinator defaults: the functor heads
    assert_eq!(g.head(np, vp, s, Combinator::BackwardApplication), 1);
    assert_eq!(g.head(det, n, np, Combinator::ForwardApplication), 0);

    let loaded = g.load_heads("NP/N\tN NP 1\nNP[nb]/N N NP 3 10\n").unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(g.head(det, n, np, Combinator::ForwardApplication), 1);

    let err = g.load_heads("NP N\n").unwrap_err();
    assert!(matches!(err, GrammarError::HeadLine { line: 1, .. }));
  }

  #[test]
  fn test_extend_vocab() {
    let mut g: Grammar = RULES.parse().unwrap();
    let before = g.vocab().len();
    g.extend_vocab(["N/N", "NP"]);
    assert_eq!(g.vocab().len(), before + 1);
    assert!(!g.label("N/N").is_unknown());
  }
}
