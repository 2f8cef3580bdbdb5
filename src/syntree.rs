use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

/// A derivation tree with categories on the branches and words on the leaves
#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  /// The words under this tree, left to right
  pub fn leaves(&self) -> Vec<&Word<U>> {
    match self {
      Self::Leaf(w) => vec![w],
      Self::Branch(_, children) => children.iter().flat_map(|c| c.leaves()).collect(),
    }
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(t) => write!(f, "{}", t),
      Self::Branch(t, ts) => {
        write!(f, "({}", t)?;
        if ts.len() == 1 && ts[0].is_leaf() {
          write!(f, " ({}))", ts[0])
        } else {
          for t in ts.iter() {
            let fmt = format!("{}", t);
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}

#[test]
fn test_display_indents_children() {
  let leaf = |value: &str, pos: usize| {
    SynTree::Branch(
      Constituent {
        value: "N".to_string(),
        span: (pos, pos + 1),
      },
      vec![SynTree::Leaf(Word {
        value: value.to_string(),
        span: (pos, pos + 1),
      })],
    )
  };
  let tree = SynTree::Branch(
    Constituent {
      value: "N".to_string(),
      span: (0, 2),
    },
    vec![leaf("cat", 0), leaf("food", 1)],
  );

  assert_eq!(
    tree.to_string(),
    "(0..2: N\n  (0..1: N (0..1: cat))\n  (1..2: N (1..2: food)))"
  );
  assert_eq!(tree.span(), (0, 2));
  assert_eq!(
    tree.leaves().iter().map(|w| w.value.as_str()).collect::<Vec<_>>(),
    vec!["cat", "food"]
  );
}
