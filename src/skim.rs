use std::collections::VecDeque;

use crate::chart::{Chart, Span};
use crate::decode::Derivation;

impl<'g> Chart<'g> {
  /// Covers the sentence with derivations of the longest constituents the chart found.
  ///
  /// Each scope (initially the whole sentence) takes its longest non-empty cell, ties
  /// going to the earliest; what's left on either side becomes a new scope, except that
  /// single tokens are taken as they are. The result is ordered by start and covers every
  /// token exactly once.
  ///
  /// Coverage needs every leaf cell to hold a category, which [`crate::Parser::parse`]
  /// guarantees. On a chart filled by hand, a token with an empty leaf cell is missing from
  /// the result (and trips a debug assertion).
  pub fn skim(&self) -> Vec<Derivation> {
    self
      .skim_spans()
      .into_iter()
      .filter_map(|span| {
        let derivation = self.decode_span(span);
        debug_assert!(derivation.is_some(), "skimmed span {} has no category", span);
        derivation
      })
      .collect()
  }

  /// The spans [`Chart::skim`] decodes
  pub fn skim_spans(&self) -> Vec<Span> {
    let n = self.len();
    if n == 0 {
      return Vec::new();
    }

    let mut spans = Vec::new();
    let mut scopes = VecDeque::from([Span::new(0, n)]);
    while let Some(scope) = scopes.pop_front() {
      if scope.is_leaf() {
        spans.push(scope);
        continue;
      }

      let longest = self
        .cells()
        .filter(|c| !c.is_empty() && scope.contains(c.span()))
        .map(|c| c.span())
        .fold(None, |best: Option<Span>, span| match best {
          Some(b) if b.len() >= span.len() => best,
          _ => Some(span),
        });

      let Some(found) = longest else {
        // nothing to decode here, not even a word
        spans.extend((scope.start..scope.end).map(Span::leaf));
        continue;
      };
      spans.push(found);

      for rest in [(scope.start, found.start), (found.end, scope.end)] {
        match rest.1 - rest.0 {
          0 => {}
          1 => spans.push(Span::new(rest.0, rest.1)),
          _ => scopes.push_back(Span::new(rest.0, rest.1)),
        }
      }
    }

    spans.sort();
    spans
  }
}
