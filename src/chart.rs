use std::fmt;
use std::ops::{Index, IndexMut};

use ahash::HashMap;

use crate::grammar::Grammar;
use crate::oracle::Vector;
use crate::rules::Combinator;
use crate::vocab::Label;

/// Half-open token interval `[start, end)`
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
  pub start: usize,
  pub end: usize,
}

impl Span {
  pub fn new(start: usize, end: usize) -> Self {
    debug_assert!(start < end, "empty span {}..{}", start, end);
    Self { start, end }
  }

  /// The span of the single token at `position`
  pub fn leaf(position: usize) -> Self {
    Self::new(position, position + 1)
  }

  pub fn len(self) -> usize {
    self.end - self.start
  }

  pub fn is_leaf(self) -> bool {
    self.len() == 1
  }

  pub fn contains(self, other: Span) -> bool {
    self.start <= other.start && other.end <= self.end
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({},{})", self.start, self.end)
  }
}

/// Address of a category: its cell, and its slot in that cell's arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CategoryRef {
  pub span: Span,
  pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backpointer {
  Lexical { word: String },
  Unary(CategoryRef),
  Binary(CategoryRef, CategoryRef),
}

/// One scored hypothesis for a span. Never changes after it's built.
#[derive(Debug, Clone)]
pub struct Category {
  pub span: Span,
  pub label: Label,
  pub combinator: Combinator,
  pub vector: Vector,
  /// `label_score + span_score` plus the children's totals, in log space
  pub total_score: f64,
  pub label_score: f64,
  pub span_score: f64,
  pub backpointer: Backpointer,
  /// Which child heads a binary category; 0 otherwise
  pub head: usize,
}

impl Category {
  pub fn is_leaf(&self) -> bool {
    matches!(self.backpointer, Backpointer::Lexical { .. })
  }

  pub fn children(&self) -> Vec<CategoryRef> {
    match &self.backpointer {
      Backpointer::Lexical { .. } => Vec::new(),
      Backpointer::Unary(child) => vec![*child],
      Backpointer::Binary(left, right) => vec![*left, *right],
    }
  }
}

/// What [`Cell::insert`] did with a category
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Insertion {
  /// First category with this label, stored at the index
  New(usize),
  /// Beat the previous best for its label, stored at the index
  Improved(usize),
  /// No better than what the cell already has
  Rejected,
}

impl Insertion {
  /// The new category's index if the cell changed
  pub fn changed(self) -> Option<usize> {
    match self {
      Self::New(idx) | Self::Improved(idx) => Some(idx),
      Self::Rejected => None,
    }
  }
}

/// The best category per label for one span.
///
/// Categories live in an append-only arena so a [`CategoryRef`] stays valid for the life of
/// the chart. Superseded categories remain there for the parents built on them, but only
/// the best per label is visible through [`Cell::best_categories`].
#[derive(Debug, Clone)]
pub struct Cell {
  span: Span,
  categories: Vec<Category>,
  best: HashMap<Label, usize>,
  /// labels in the order they first appeared
  order: Vec<Label>,
}

impl Cell {
  pub fn new(span: Span) -> Self {
    Self {
      span,
      categories: Vec::new(),
      best: HashMap::default(),
      order: Vec::new(),
    }
  }

  pub fn span(&self) -> Span {
    self.span
  }

  /// Keeps `category` only if it beats, strictly, every earlier category with its label
  pub fn insert(&mut self, category: Category) -> Insertion {
    debug_assert_eq!(category.span, self.span);
    let idx = self.categories.len();
    match self.best.get(&category.label).copied() {
      Some(current) if self.categories[current].total_score >= category.total_score => {
        Insertion::Rejected
      }
      Some(_) => {
        self.best.insert(category.label, idx);
        self.categories.push(category);
        Insertion::Improved(idx)
      }
      None => {
        self.best.insert(category.label, idx);
        self.order.push(category.label);
        self.categories.push(category);
        Insertion::New(idx)
      }
    }
  }

  pub fn get(&self, index: usize) -> Option<&Category> {
    self.categories.get(index)
  }

  pub fn best(&self, label: Label) -> Option<&Category> {
    self.best.get(&label).map(|idx| &self.categories[*idx])
  }

  pub fn is_best(&self, index: usize) -> bool {
    self
      .categories
      .get(index)
      .is_some_and(|c| self.best.get(&c.label) == Some(&index))
  }

  /// Arena indices of the best category per label, in label first-appearance order
  pub fn best_indices(&self) -> impl Iterator<Item = usize> + '_ {
    self.order.iter().map(|label| self.best[label])
  }

  pub fn best_categories(&self) -> impl Iterator<Item = &Category> + '_ {
    self.best_indices().map(|idx| &self.categories[idx])
  }

  /// The highest-scoring category; ties go to the label seen first
  pub fn top(&self) -> Option<(usize, &Category)> {
    self
      .best_indices()
      .map(|idx| (idx, &self.categories[idx]))
      .fold(None, |top: Option<(usize, &Category)>, (idx, c)| match top {
        Some((_, t)) if t.total_score >= c.total_score => top,
        _ => Some((idx, c)),
      })
  }

  /// Number of retained categories, one per label
  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }
}

/// Numbers describing a finished chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStats {
  pub cells: usize,
  pub non_empty: usize,
  pub categories: usize,
  pub timed_out: bool,
}

impl fmt::Display for ChartStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} cells, {} non-empty, {} categories{}",
      self.cells,
      self.non_empty,
      self.categories,
      if self.timed_out { ", timed out" } else { "" }
    )
  }
}

/// Triangular table of cells, one per span of the sentence. Every cell exists from the
/// start; cells the parser never reached are just empty.
#[derive(Debug, Clone)]
pub struct Chart<'g> {
  grammar: &'g Grammar,
  words: Vec<String>,
  cells: Vec<Cell>,
  pub(crate) timed_out: bool,
}

impl<'g> Chart<'g> {
  pub fn new(grammar: &'g Grammar, words: &[&str]) -> Self {
    let n = words.len();
    let cells = (0..n)
      .flat_map(|start| (start + 1..=n).map(move |end| Cell::new(Span::new(start, end))))
      .collect();
    Self {
      grammar,
      words: words.iter().map(|w| w.to_string()).collect(),
      cells,
      timed_out: false,
    }
  }

  /// Sentence length in tokens
  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  pub fn words(&self) -> &[String] {
    &self.words
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  /// Whether the wall-clock budget ran out before every span was processed
  pub fn timed_out(&self) -> bool {
    self.timed_out
  }

  /// Cells in `(start, end)` order
  pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
    self.cells.iter()
  }

  pub fn cell(&self, span: Span) -> Option<&Cell> {
    self.position(span).map(|idx| &self.cells[idx])
  }

  /// The cell spanning the whole sentence
  pub fn root(&self) -> Option<&Cell> {
    if self.is_empty() {
      None
    } else {
      self.cell(Span::new(0, self.len()))
    }
  }

  pub fn category(&self, r: CategoryRef) -> Option<&Category> {
    self.cell(r.span).and_then(|cell| cell.get(r.index))
  }

  pub fn stats(&self) -> ChartStats {
    ChartStats {
      cells: self.cells.len(),
      non_empty: self.cells.iter().filter(|c| !c.is_empty()).count(),
      categories: self.cells.iter().map(Cell::len).sum(),
      timed_out: self.timed_out,
    }
  }

  fn position(&self, span: Span) -> Option<usize> {
    let n = self.len();
    if span.start >= span.end || span.end > n {
      return None;
    }
    // row `start` holds the `n - start` cells ending at start+1..=n
    let row = span.start * n - span.start * span.start.saturating_sub(1) / 2;
    Some(row + span.end - span.start - 1)
  }
}

impl Index<Span> for Chart<'_> {
  type Output = Cell;

  fn index(&self, span: Span) -> &Cell {
    match self.position(span) {
      Some(idx) => &self.cells[idx],
      None => panic!("span {} outside a chart of {} tokens", span, self.len()),
    }
  }
}

impl IndexMut<Span> for Chart<'_> {
  fn index_mut(&mut self, span: Span) -> &mut Cell {
    match self.position(span) {
      Some(idx) => &mut self.cells[idx],
      None => panic!("span {} outside a chart of {} tokens", span, self.len()),
    }
  }
}

impl fmt::Display for Chart<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for cell in self.cells.iter().filter(|c| !c.is_empty()) {
      let span = cell.span();
      writeln!(
        f,
        "{}..{}: {}",
        span.start,
        span.end,
        self.words[span.start..span.end].join(" ")
      )?;
      for c in cell.best_categories() {
        writeln!(
          f,
          "  {}\t{}\t{:.4}",
          self.grammar.name(c.label),
          c.combinator,
          c.total_score
        )?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;

  fn category(span: Span, label: u32, total_score: f64) -> Category {
    Category {
      span,
      label: Label(label),
      combinator: Combinator::Lexical,
      vector: Arc::from(Vec::new()),
      total_score,
      label_score: total_score,
      span_score: 0.0,
      backpointer: Backpointer::Lexical {
        word: "w".to_string(),
      },
      head: 0,
    }
  }

  #[test]
  fn test_cell_replace_on_improvement() {
    let span = Span::leaf(0);
    let mut cell = Cell::new(span);
    assert_eq!(cell.insert(category(span, 1, -2.0)), Insertion::New(0));
    assert_eq!(cell.insert(category(span, 2, -1.0)), Insertion::New(1));
    assert_eq!(cell.insert(category(span, 1, -3.0)), Insertion::Rejected);
    assert_eq!(cell.insert(category(span, 1, -0.5)), Insertion::Improved(2));

    assert_eq!(cell.len(), 2);
    assert_eq!(cell.best(Label(1)).unwrap().total_score, -0.5);
    assert!(cell.is_best(2));
    assert!(!cell.is_best(0));
    assert_eq!(cell.best_indices().collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(cell.top().unwrap().0, 2);
  }

  #[test]
  fn test_cell_insertion_is_idempotent() {
    let span = Span::new(0, 2);
    let mut cell = Cell::new(span);
    assert!(cell.insert(category(span, 3, -1.0)).changed().is_some());
    assert_eq!(cell.insert(category(span, 3, -1.0)), Insertion::Rejected);
    assert_eq!(cell.len(), 1);
    assert_eq!(cell.best_indices().collect::<Vec<_>>(), vec![0]);
  }

  #[test]
  fn test_top_prefers_first_label_on_ties() {
    let span = Span::leaf(0);
    let mut cell = Cell::new(span);
    cell.insert(category(span, 4, -1.0));
    cell.insert(category(span, 2, -1.0));
    assert_eq!(cell.top().unwrap().1.label, Label(4));
    assert!(Cell::new(span).top().is_none());
  }

  #[test]
  fn test_chart_is_triangular() {
    let g = Grammar::new();
    for n in 1..6 {
      let words = vec!["w"; n];
      let chart = Chart::new(&g, &words);
      assert_eq!(chart.cells().count(), n * (n + 1) / 2);
      for start in 0..n {
        for end in start + 1..=n {
          let span = Span::new(start, end);
          assert_eq!(chart[span].span(), span);
        }
      }
      assert!(chart.cell(Span::new(0, n + 1)).is_none());
      assert_eq!(chart.root().unwrap().span(), Span::new(0, n));
    }
  }

  #[test]
  fn test_span() {
    let span = Span::new(1, 4);
    assert_eq!(span.len(), 3);
    assert!(span.contains(Span::new(2, 4)));
    assert!(!span.contains(Span::new(0, 2)));
    assert_eq!(span.to_string(), "(1,4)");
    assert!(Span::leaf(3).is_leaf());
  }
}
