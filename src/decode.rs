//! Serialization of chart derivations to the CCGbank AUTO bracket format:
//!
//! ```text
//! (<T S[dcl] 1 2> (<L NP POS POS Mary NP>) (<L S[dcl]\NP POS POS sleeps S[dcl]\NP>) )
//! ```

use std::fmt;

use itertools::Itertools;

use crate::chart::{Backpointer, Chart, CategoryRef, Span};
use crate::syntree::{Constituent, SynTree, Word};

/// A decoded derivation: the AUTO tokens of one tree and the span it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
  pub span: Span,
  pub tokens: Vec<String>,
}

impl fmt::Display for Derivation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.tokens.iter().join(" "))
  }
}

enum Visit {
  Open(CategoryRef),
  Close,
}

impl<'g> Chart<'g> {
  /// Best derivation of the whole sentence, or `None` when the root cell is empty
  pub fn decode(&self) -> Option<Derivation> {
    self.root().and_then(|root| self.decode_span(root.span()))
  }

  /// Best derivation of a single cell
  pub fn decode_span(&self, span: Span) -> Option<Derivation> {
    let (index, _) = self.cell(span)?.top()?;
    self.decode_category(CategoryRef { span, index })
  }

  /// Unfolds a category in pre-order, children left to right
  pub fn decode_category(&self, root: CategoryRef) -> Option<Derivation> {
    let grammar = self.grammar();
    let mut tokens = Vec::new();
    let mut stack = vec![Visit::Open(root)];

    while let Some(visit) = stack.pop() {
      let r = match visit {
        Visit::Close => {
          tokens.push(")".to_string());
          continue;
        }
        Visit::Open(r) => r,
      };

      let c = self.category(r)?;
      let name = grammar.name(c.label);
      match &c.backpointer {
        Backpointer::Lexical { word } => {
          tokens.extend([
            "(<L".to_string(),
            name.to_string(),
            "POS".to_string(),
            "POS".to_string(),
            word.clone(),
            format!("{}>)", name),
          ]);
        }
        Backpointer::Unary(child) => {
          tokens.extend([
            "(<T".to_string(),
            name.to_string(),
            "0".to_string(),
            "1>".to_string(),
          ]);
          stack.push(Visit::Close);
          stack.push(Visit::Open(*child));
        }
        Backpointer::Binary(left, right) => {
          tokens.extend([
            "(<T".to_string(),
            name.to_string(),
            c.head.to_string(),
            "2>".to_string(),
          ]);
          stack.push(Visit::Close);
          stack.push(Visit::Open(*right));
          stack.push(Visit::Open(*left));
        }
      }
    }

    Some(Derivation {
      span: root.span,
      tokens,
    })
  }
}

impl Derivation {
  /// Reads the tokens back into a tree, positioning words from `span.start`. `None` if the
  /// tokens aren't well-formed AUTO.
  pub fn to_syntree(&self) -> Option<SynTree<String, String>> {
    let mut open: Vec<(String, Vec<SynTree<String, String>>)> = Vec::new();
    let mut done = None;
    let mut position = self.span.start;
    let mut tokens = self.tokens.iter();

    while let Some(token) = tokens.next() {
      let tree = match token.as_str() {
        "(<L" => {
          let (cat, _, _, word, _) = tokens.next_tuple()?;
          let span = (position, position + 1);
          position += 1;
          SynTree::Branch(
            Constituent {
              value: cat.clone(),
              span,
            },
            vec![SynTree::Leaf(Word {
              value: word.clone(),
              span,
            })],
          )
        }
        "(<T" => {
          let (cat, _, _) = tokens.next_tuple()?;
          open.push((cat.clone(), Vec::new()));
          continue;
        }
        ")" => {
          let (cat, children) = open.pop()?;
          let span = (children.first()?.span().0, children.last()?.span().1);
          SynTree::Branch(Constituent { value: cat, span }, children)
        }
        _ => return None,
      };

      match open.last_mut() {
        Some((_, children)) => children.push(tree),
        None if done.is_none() => done = Some(tree),
        None => return None,
      }
    }

    if open.is_empty() { done } else { None }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::chart::Category;
  use crate::grammar::Grammar;
  use crate::rules::Combinator;

  fn leaf(chart: &mut Chart<'_>, position: usize, label: &str, word: &str) -> CategoryRef {
    let span = Span::leaf(position);
    let label = chart.grammar().label(label);
    let index = chart[span]
      .insert(Category {
        span,
        label,
        combinator: Combinator::Lexical,
        vector: Arc::from(Vec::new()),
        total_score: 0.0,
        label_score: 0.0,
        span_score: 0.0,
        backpointer: Backpointer::Lexical {
          word: word.to_string(),
        },
        head: 0,
      })
      .changed()
      .unwrap();
    CategoryRef { span, index }
  }

  fn grammar() -> Grammar {
    "10 # NP --> NP/N N\n10 # S --> NP S\\NP\n10 # S/(S\\NP) --> NP"
      .parse()
      .unwrap()
  }

  #[test]
  fn test_decode_single_word() {
    let g = grammar();
    let mut chart = Chart::new(&g, &["word"]);
    leaf(&mut chart, 0, "N", "word");
    let d = chart.decode().unwrap();
    assert_eq!(d.to_string(), "(<L N POS POS word N>)");
    assert_eq!(d.span, Span::new(0, 1));
  }

  #[test]
  fn test_decode_preorder() {
    let g = grammar();
    let mut chart = Chart::new(&g, &["the", "cat"]);
    let det = leaf(&mut chart, 0, "NP/N", "the");
    let n = leaf(&mut chart, 1, "N", "cat");
    let span = Span::new(0, 2);
    let np = chart[span]
      .insert(Category {
        span,
        label: g.label("NP"),
        combinator: Combinator::ForwardApplication,
        vector: Arc::from(Vec::new()),
        total_score: -1.0,
        label_score: -1.0,
        span_score: 0.0,
        backpointer: Backpointer::Binary(det, n),
        head: 0,
      })
      .changed()
      .unwrap();
    chart[span].insert(Category {
      span,
      label: g.label(r"S/(S\NP)"),
      combinator: Combinator::TypeRaising,
      vector: Arc::from(Vec::new()),
      total_score: -2.0,
      label_score: -1.0,
      span_score: 0.0,
      backpointer: Backpointer::Unary(CategoryRef { span, index: np }),
      head: 0,
    });

    assert_eq!(
      chart.decode().unwrap().to_string(),
      "(<T NP 0 2> (<L NP/N POS POS the NP/N>) (<L N POS POS cat N>) )"
    );
    let raised = chart
      .decode_category(CategoryRef { span, index: 1 })
      .unwrap();
    assert_eq!(
      raised.to_string(),
      r"(<T S/(S\NP) 0 1> (<T NP 0 2> (<L NP/N POS POS the NP/N>) (<L N POS POS cat N>) ) )"
    );

    let tree = raised.to_syntree().unwrap();
    assert_eq!(tree.span(), (0, 2));
    assert_eq!(
      tree.leaves().iter().map(|w| w.value.as_str()).collect::<Vec<_>>(),
      vec!["the", "cat"]
    );
  }

  #[test]
  fn test_decode_empty_root() {
    let g = grammar();
    let chart = Chart::new(&g, &["the", "cat"]);
    assert!(chart.decode().is_none());
  }

  #[test]
  fn test_to_syntree_rejects_garbage() {
    let d = Derivation {
      span: Span::new(0, 1),
      tokens: vec!["(<T".to_string(), "NP".to_string()],
    };
    assert!(d.to_syntree().is_none());
  }
}
