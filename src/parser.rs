use std::collections::VecDeque;
use std::time::Instant;

use itertools::Itertools;
use tracing::{debug, instrument, trace, warn};

use crate::chart::{Backpointer, Category, CategoryRef, Chart, Span};
use crate::config::ParserConfig;
use crate::error::{OracleError, ParseError};
use crate::grammar::Grammar;
use crate::oracle::{Distribution, ScoringOracle, Vector, log_prob};
use crate::rules::{Combinator, eisner_permits};
use crate::utils::unescape_token;

/// CKY over CCG categories: every span gets the best category per label that the grammar
/// and the oracle allow, built from the best categories of its sub-spans.
#[derive(Debug, Clone)]
pub struct Parser<'g> {
  grammar: &'g Grammar,
  config: ParserConfig,
}

impl<'g> Parser<'g> {
  pub fn new(grammar: &'g Grammar, config: ParserConfig) -> Self {
    Self { grammar, config }
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  /// Fills a chart for `sentence`. Running out of time isn't an error: the chart comes back
  /// with [`Chart::timed_out`] set and the unreached spans empty.
  #[instrument(level = "debug", skip_all, fields(tokens = sentence.len()))]
  pub fn parse<O>(&self, sentence: &[&str], oracle: &O) -> Result<Chart<'g>, ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    if sentence.is_empty() {
      return Err(ParseError::EmptySentence);
    }
    let started = Instant::now();
    let budget = self.config.max_parse_time();
    let n = sentence.len();

    let unescaped = sentence.iter().map(|w| unescape_token(w)).collect::<Vec<_>>();
    let unescaped = unescaped.iter().map(|w| w.as_ref()).collect::<Vec<&str>>();

    let mut chart = Chart::new(self.grammar, sentence);
    for position in 0..n {
      self.init_leaf(&mut chart, &unescaped, position, oracle)?;
      self.unary_closure(&mut chart, Span::leaf(position), oracle)?;
    }

    for len in 2..=n {
      if budget.is_some_and(|budget| started.elapsed() >= budget) {
        warn!(
          tokens = n,
          reached = len - 1,
          elapsed_ms = started.elapsed().as_millis() as u64,
          "parse budget exhausted"
        );
        chart.timed_out = true;
        break;
      }

      for start in 0..=n - len {
        let span = Span::new(start, start + len);
        for split in span.start + 1..span.end {
          self.combine(&mut chart, span, split, oracle)?;
        }
        trace!(%span, categories = chart[span].len(), "combined");
        self.unary_closure(&mut chart, span, oracle)?;
      }
    }

    let stats = chart.stats();
    debug!(
      cells = stats.cells,
      non_empty = stats.non_empty,
      categories = stats.categories,
      timed_out = stats.timed_out,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "parsed"
    );
    Ok(chart)
  }

  /// Top supertag unconditionally, then the rest while they stay above the threshold
  fn init_leaf<O>(
    &self,
    chart: &mut Chart<'g>,
    sentence: &[&str],
    position: usize,
    oracle: &O,
  ) -> Result<(), ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    let span = Span::leaf(position);
    let leaf = oracle
      .score_leaf(sentence, position)
      .map_err(ParseError::oracle(span))?;

    let mut ranked = leaf.distribution.ranked().into_iter();
    let top = ranked.next().ok_or(ParseError::Oracle {
      span,
      source: OracleError::DegenerateLeaf { position },
    })?;
    let threshold = self.config.stag_threshold;
    let word = chart.words()[position].clone();

    for (label, p) in std::iter::once(top).chain(ranked.take_while(|(_, p)| *p > threshold)) {
      let label_score = log_prob("supertag probability", p).map_err(ParseError::oracle(span))?;
      chart[span].insert(Category {
        span,
        label,
        combinator: Combinator::Lexical,
        vector: leaf.vector.clone(),
        total_score: label_score,
        label_score,
        span_score: 0.0,
        backpointer: Backpointer::Lexical { word: word.clone() },
        head: 0,
      });
    }

    trace!(%span, categories = chart[span].len(), "supertagged");
    Ok(())
  }

  /// Applies unary rules until nothing changes. Only categories that actually changed the
  /// cell go back on the queue, so a well-behaved grammar always reaches a fixpoint; a
  /// pathological one hits the step cap and fails instead of looping.
  fn unary_closure<O>(&self, chart: &mut Chart<'g>, span: Span, oracle: &O) -> Result<(), ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    let vocab_len = self.grammar.vocab().len();
    let cap = chart[span].best_indices().count() + vocab_len * vocab_len;
    self.unary_closure_capped(chart, span, oracle, cap)
  }

  /// [`Parser::unary_closure`] with an explicit cap on queue pops. Strict improvement bounds
  /// the real work well below the default cap, so it only ever trips on a broken oracle or
  /// a smaller cap.
  fn unary_closure_capped<O>(
    &self,
    chart: &mut Chart<'g>,
    span: Span,
    oracle: &O,
    cap: usize,
  ) -> Result<(), ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    let cell = &mut chart[span];
    let mut queue = cell.best_indices().collect::<VecDeque<_>>();
    let mut steps = 0;

    while let Some(index) = queue.pop_front() {
      steps += 1;
      if steps > cap {
        return Err(ParseError::UnaryClosureDiverged { span, steps });
      }
      if !cell.is_best(index) {
        continue;
      }

      let Some(child) = cell.get(index) else {
        continue;
      };
      let Some(productions) = self.grammar.unary_productions(child.label) else {
        continue;
      };
      let (vector, child_total) = (child.vector.clone(), child.total_score);

      let Some((span_score, labels)) = self.score(span, &vector, oracle)? else {
        continue;
      };

      for production in productions.iter().filter(|p| !p.parent.is_unknown()) {
        let p = labels.prob(production.parent);
        let label_score = log_prob("phrase label probability", p).map_err(ParseError::oracle(span))?;
        if p <= self.config.phrase_label_threshold {
          continue;
        }

        let inserted = cell.insert(Category {
          span,
          label: production.parent,
          combinator: production.combinator,
          vector: vector.clone(),
          total_score: label_score + span_score + child_total,
          label_score,
          span_score,
          backpointer: Backpointer::Unary(CategoryRef { span, index }),
          head: 0,
        });
        if let Some(new_index) = inserted.changed() {
          queue.push_back(new_index);
        }
      }
    }

    trace!(%span, categories = cell.len(), steps, "unary closure");
    Ok(())
  }

  /// Combines every pair of best categories from `(span.start, split)` and `(split, span.end)`
  fn combine<O>(&self, chart: &mut Chart<'g>, span: Span, split: usize, oracle: &O) -> Result<(), ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    let left_span = Span::new(span.start, split);
    let right_span = Span::new(split, span.end);
    let pairs = chart[left_span]
      .best_indices()
      .cartesian_product(chart[right_span].best_indices().collect::<Vec<_>>())
      .collect::<Vec<_>>();

    for (li, ri) in pairs {
      let left_ref = CategoryRef {
        span: left_span,
        index: li,
      };
      let right_ref = CategoryRef {
        span: right_span,
        index: ri,
      };
      let (Some(left), Some(right)) = (chart.category(left_ref), chart.category(right_ref)) else {
        continue;
      };

      let Some(productions) = self.grammar.binary_productions(left.label, right.label) else {
        continue;
      };
      let productions = productions
        .iter()
        .filter(|p| !p.parent.is_unknown())
        .filter(|p| eisner_permits(left.combinator, right.combinator, p.combinator))
        .collect::<Vec<_>>();
      if productions.is_empty() {
        continue;
      }

      let vector = oracle
        .compose(&left.vector, &right.vector)
        .map_err(ParseError::oracle(span))?;
      let Some((span_score, labels)) = self.score(span, &vector, oracle)? else {
        continue;
      };

      let mut candidates = Vec::with_capacity(productions.len());
      for production in productions {
        let p = labels.prob(production.parent);
        let label_score = log_prob("phrase label probability", p).map_err(ParseError::oracle(span))?;
        if p <= self.config.phrase_label_threshold {
          continue;
        }
        candidates.push(Category {
          span,
          label: production.parent,
          combinator: production.combinator,
          vector: vector.clone(),
          total_score: label_score + span_score + left.total_score + right.total_score,
          label_score,
          span_score,
          backpointer: Backpointer::Binary(left_ref, right_ref),
          head: self
            .grammar
            .head(left.label, right.label, production.parent, production.combinator),
        });
      }

      let cell = &mut chart[span];
      for candidate in candidates {
        cell.insert(candidate);
      }
    }

    Ok(())
  }

  /// The span log-probability and phrase-label distribution for `vector`, or `None` if the
  /// span isn't likely enough to be a constituent
  fn score<O>(
    &self,
    span: Span,
    vector: &Vector,
    oracle: &O,
  ) -> Result<Option<(f64, Distribution)>, ParseError>
  where
    O: ScoringOracle + ?Sized,
  {
    let p = oracle.score_span(vector).map_err(ParseError::oracle(span))?;
    let span_score = log_prob("span probability", p).map_err(ParseError::oracle(span))?;
    if p <= self.config.span_threshold {
      return Ok(None);
    }
    let labels = oracle
      .score_phrase_label(vector)
      .map_err(ParseError::oracle(span))?;
    Ok(Some((span_score, labels)))
  }
}
