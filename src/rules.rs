use std::fmt;
use std::str::FromStr;

use crate::syncat::{Slash, SynCat};
use crate::vocab::Label;

/// Which rule produced a category. The short names are the ones used in CCGbank-style
/// derivation dumps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Combinator {
  /// `X/Y Y => X`
  ForwardApplication,
  /// `Y X\Y => X`
  BackwardApplication,
  /// `X/Y Y/Z => X/Z`
  ForwardComposition,
  /// `Y\Z X\Y => X\Z`
  BackwardComposition,
  /// `X/Y (Y/Z)/W => (X/Z)/W`
  GeneralizedForwardComposition,
  /// `(Y\Z)\W X\Y => (X\Z)\W`
  GeneralizedBackwardComposition,
  /// `X/Y Y\Z => X\Z`
  ForwardCrossedComposition,
  /// `Y/Z X\Y => X/Z`
  BackwardCrossedComposition,
  Conjunction,
  LeftPunctuation,
  RightPunctuation,
  /// `X => T/(T\X)`
  TypeRaising,
  /// Any other unary type-changing rule
  UnaryRule,
  /// A supertag assigned to a word
  Lexical,
  /// A binary rule that no combinator accounts for
  Other,
}

impl Combinator {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ForwardApplication => "fa",
      Self::BackwardApplication => "ba",
      Self::ForwardComposition => "fc",
      Self::BackwardComposition => "bc",
      Self::GeneralizedForwardComposition => "gfc",
      Self::GeneralizedBackwardComposition => "gbc",
      Self::ForwardCrossedComposition => "fx",
      Self::BackwardCrossedComposition => "bx",
      Self::Conjunction => "conj",
      Self::LeftPunctuation => "lp",
      Self::RightPunctuation => "rp",
      Self::TypeRaising => "tr",
      Self::UnaryRule => "lex",
      Self::Lexical => "stag",
      Self::Other => "other",
    }
  }

  pub fn is_forward_composition(self) -> bool {
    matches!(
      self,
      Self::ForwardComposition | Self::GeneralizedForwardComposition
    )
  }

  pub fn is_backward_composition(self) -> bool {
    matches!(
      self,
      Self::BackwardComposition | Self::GeneralizedBackwardComposition
    )
  }

  pub fn is_unary(self) -> bool {
    matches!(self, Self::TypeRaising | Self::UnaryRule)
  }

  /// Head child implied by the combinator when the grammar has no statistics for a rule:
  /// the functor for application and composition, the conjunct for coordination, the
  /// non-punctuation side for punctuation rules.
  pub fn default_head(self) -> usize {
    match self {
      Self::BackwardApplication
      | Self::BackwardComposition
      | Self::GeneralizedBackwardComposition
      | Self::BackwardCrossedComposition
      | Self::LeftPunctuation
      | Self::Conjunction => 1,
      _ => 0,
    }
  }
}

impl fmt::Display for Combinator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Combinator {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "fa" => Self::ForwardApplication,
      "ba" => Self::BackwardApplication,
      "fc" => Self::ForwardComposition,
      "bc" => Self::BackwardComposition,
      "gfc" => Self::GeneralizedForwardComposition,
      "gbc" => Self::GeneralizedBackwardComposition,
      "fx" => Self::ForwardCrossedComposition,
      "bx" => Self::BackwardCrossedComposition,
      "conj" => Self::Conjunction,
      "lp" => Self::LeftPunctuation,
      "rp" => Self::RightPunctuation,
      "tr" => Self::TypeRaising,
      "lex" => Self::UnaryRule,
      "stag" => Self::Lexical,
      "other" => Self::Other,
      _ => return Err(format!("unknown combinator '{}'", s)),
    })
  }
}

/// Eisner normal form: the output of forward composition can't be the primary functor of a
/// forward application or composition, and symmetrically for backward composition on the right.
pub fn eisner_permits(left: Combinator, right: Combinator, parent: Combinator) -> bool {
  if left.is_forward_composition()
    && (parent == Combinator::ForwardApplication || parent.is_forward_composition())
  {
    return false;
  }
  if right.is_backward_composition()
    && (parent == Combinator::BackwardApplication || parent.is_backward_composition())
  {
    return false;
  }
  true
}

/// One licensed parent for a child label or label pair
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Production {
  pub parent: Label,
  pub combinator: Combinator,
}

impl Production {
  pub fn new(parent: Label, combinator: Combinator) -> Self {
    Self { parent, combinator }
  }
}

/// A rule as it was read from the grammar file, before it's folded into the lookup tables
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
  Binary {
    freq: u64,
    parent: String,
    left: String,
    right: String,
  },
  Unary {
    freq: u64,
    parent: String,
    child: String,
  },
}

impl Rule {
  pub fn freq(&self) -> u64 {
    match self {
      Self::Binary { freq, .. } | Self::Unary { freq, .. } => *freq,
    }
  }

  pub fn parent(&self) -> &str {
    match self {
      Self::Binary { parent, .. } | Self::Unary { parent, .. } => parent,
    }
  }

  /// Works out which combinator licenses this rule from the shape of its categories
  pub fn combinator(&self) -> Combinator {
    match self {
      Self::Binary {
        parent,
        left,
        right,
        ..
      } => match (parent.parse(), left.parse(), right.parse()) {
        (Ok(p), Ok(l), Ok(r)) => classify_binary(&p, &l, &r),
        _ => Combinator::Other,
      },
      Self::Unary { parent, child, .. } => match (parent.parse(), child.parse()) {
        (Ok(p), Ok(c)) => classify_unary(&p, &c),
        _ => Combinator::UnaryRule,
      },
    }
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Binary {
        freq,
        parent,
        left,
        right,
      } => write!(f, "{} # {} --> {} {}", freq, parent, left, right),
      Self::Unary {
        freq,
        parent,
        child,
      } => write!(f, "{} # {} --> {}", freq, parent, child),
    }
  }
}

pub fn classify_unary(parent: &SynCat, child: &SynCat) -> Combinator {
  let raised = |outer: Slash, inner: Slash| {
    parent.split(outer).is_some_and(|(t, arg)| {
      arg
        .split(inner)
        .is_some_and(|(t2, x)| t.matches(t2) && x.matches(child))
    })
  };
  if raised(Slash::Forward, Slash::Backward) || raised(Slash::Backward, Slash::Forward) {
    Combinator::TypeRaising
  } else {
    Combinator::UnaryRule
  }
}

pub fn classify_binary(parent: &SynCat, left: &SynCat, right: &SynCat) -> Combinator {
  use Combinator::*;
  use Slash::*;

  // coordination: `conj X => X[conj]`, `conj X => X\X`, and `X X[conj] => X`
  if left.is_conjunction() {
    if parent.as_conj().is_some_and(|x| x.matches(right)) {
      return Conjunction;
    }
    if parent
      .split(Backward)
      .is_some_and(|(x, y)| x.matches(right) && y.matches(right))
    {
      return Conjunction;
    }
  }
  if right
    .as_conj()
    .is_some_and(|x| x.matches(left) && parent.matches(left))
  {
    return Conjunction;
  }

  if left.is_punctuation() && parent.matches(right) {
    return LeftPunctuation;
  }
  if right.is_punctuation() && parent.matches(left) {
    return RightPunctuation;
  }

  if let Some((x, y)) = left.split(Forward) {
    if y.matches(right) && x.matches(parent) {
      return ForwardApplication;
    }
  }
  if let Some((x, y)) = right.split(Backward) {
    if y.matches(left) && x.matches(parent) {
      return BackwardApplication;
    }
  }

  // X/Y Y|Z => X|Z
  if let (Some((x, y)), Some((y2, slash, z))) = (left.split(Forward), right.as_functor()) {
    if y.matches(y2) && composes(parent, x, slash, z) {
      return match slash {
        Forward => ForwardComposition,
        Backward => ForwardCrossedComposition,
      };
    }
  }
  // Y|Z X\Y => X|Z
  if let (Some((y2, slash, z)), Some((x, y))) = (left.as_functor(), right.split(Backward)) {
    if y.matches(y2) && composes(parent, x, slash, z) {
      return match slash {
        Backward => BackwardComposition,
        Forward => BackwardCrossedComposition,
      };
    }
  }

  // X/Y (Y|Z)|W => (X|Z)|W
  if let (Some((x, y)), Some((inner, outer, w))) = (left.split(Forward), right.as_functor()) {
    if let Some((y2, slash, z)) = inner.as_functor() {
      if y.matches(y2) && composes2(parent, x, slash, z, outer, w) {
        return GeneralizedForwardComposition;
      }
    }
  }
  // (Y|Z)|W X\Y => (X|Z)|W
  if let (Some((inner, outer, w)), Some((x, y))) = (left.as_functor(), right.split(Backward)) {
    if let Some((y2, slash, z)) = inner.as_functor() {
      if y.matches(y2) && composes2(parent, x, slash, z, outer, w) {
        return GeneralizedBackwardComposition;
      }
    }
  }

  Other
}

/// Does `parent` have the shape `x slash z`?
fn composes(parent: &SynCat, x: &SynCat, slash: Slash, z: &SynCat) -> bool {
  parent
    .split(slash)
    .is_some_and(|(px, pz)| px.matches(x) && pz.matches(z))
}

/// Does `parent` have the shape `(x slash z) outer w`?
fn composes2(
  parent: &SynCat,
  x: &SynCat,
  slash: Slash,
  z: &SynCat,
  outer: Slash,
  w: &SynCat,
) -> bool {
  parent
    .split(outer)
    .is_some_and(|(inner, pw)| pw.matches(w) && composes(inner, x, slash, z))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn binary(parent: &str, left: &str, right: &str) -> Combinator {
    Rule::Binary {
      freq: 1,
      parent: parent.to_string(),
      left: left.to_string(),
      right: right.to_string(),
    }
    .combinator()
  }

  fn unary(parent: &str, child: &str) -> Combinator {
    Rule::Unary {
      freq: 1,
      parent: parent.to_string(),
      child: child.to_string(),
    }
    .combinator()
  }

  #[test]
  fn test_classify_application() {
    assert_eq!(binary("NP", "NP[nb]/N", "N"), Combinator::ForwardApplication);
    assert_eq!(binary("S[dcl]", "NP", r"S[dcl]\NP"), Combinator::BackwardApplication);
    assert_eq!(
      binary(r"S[dcl]\NP", r"(S[dcl]\NP)/NP", "NP"),
      Combinator::ForwardApplication
    );
  }

  #[test]
  fn test_classify_composition() {
    assert_eq!(binary("S/NP", "S/S", "S/NP"), Combinator::ForwardComposition);
    assert_eq!(
      binary(r"S\NP", r"S\NP", r"S\S"),
      Combinator::BackwardComposition
    );
    assert_eq!(
      binary(r"(S\NP)/NP", r"(S\NP)/(S\NP)", r"(S\NP)/NP"),
      Combinator::ForwardComposition
    );
    assert_eq!(
      binary(r"S\NP", r"S/S", r"S\NP"),
      Combinator::ForwardCrossedComposition
    );
    assert_eq!(
      binary(r"(S[dcl]\NP)/NP", r"(S[b]\NP)/NP", r"(S[dcl]\NP)\(S[b]\NP)"),
      Combinator::BackwardCrossedComposition
    );
    assert_eq!(
      binary(r"(S/NP)/PP", "S/S", r"(S/NP)/PP"),
      Combinator::GeneralizedForwardComposition
    );
  }

  #[test]
  fn test_classify_coordination_and_punctuation() {
    assert_eq!(binary("NP[conj]", "conj", "NP"), Combinator::Conjunction);
    assert_eq!(binary("NP[conj]", ",", "NP"), Combinator::Conjunction);
    assert_eq!(binary("NP", "NP", "NP[conj]"), Combinator::Conjunction);
    assert_eq!(binary(r"N\N", "conj", "N"), Combinator::Conjunction);
    assert_eq!(binary("S[dcl]", "S[dcl]", "."), Combinator::RightPunctuation);
    assert_eq!(binary("NP", "LRB", "NP"), Combinator::LeftPunctuation);
    assert_eq!(binary("NP", "NP", ","), Combinator::RightPunctuation);
  }

  #[test]
  fn test_classify_unary() {
    assert_eq!(unary(r"S/(S\NP)", "NP"), Combinator::TypeRaising);
    assert_eq!(unary(r"(S\NP)\((S\NP)/NP)", "NP"), Combinator::TypeRaising);
    assert_eq!(unary("NP", "N"), Combinator::UnaryRule);
    assert_eq!(unary(r"NP\NP", r"S[pss]\NP"), Combinator::UnaryRule);
  }

  #[test]
  fn test_classify_unknown_shape() {
    assert_eq!(binary("NP", "NP", "NP"), Combinator::Other);
    assert_eq!(binary("NP", "(NP", "NP"), Combinator::Other);
  }

  #[test]
  fn test_eisner() {
    use Combinator::*;
    assert!(!eisner_permits(ForwardComposition, Lexical, ForwardApplication));
    assert!(!eisner_permits(ForwardComposition, Lexical, ForwardComposition));
    assert!(!eisner_permits(GeneralizedForwardComposition, Lexical, ForwardApplication));
    assert!(eisner_permits(ForwardComposition, Lexical, BackwardApplication));
    assert!(!eisner_permits(Lexical, BackwardComposition, BackwardApplication));
    assert!(!eisner_permits(Lexical, BackwardComposition, BackwardComposition));
    assert!(eisner_permits(Lexical, BackwardComposition, ForwardApplication));
    assert!(eisner_permits(ForwardApplication, BackwardApplication, ForwardComposition));
  }

  #[test]
  fn test_combinator_names_roundtrip() {
    for c in [
      Combinator::ForwardApplication,
      Combinator::GeneralizedBackwardComposition,
      Combinator::Lexical,
      Combinator::Other,
    ] {
      assert_eq!(c.as_str().parse::<Combinator>(), Ok(c));
    }
    assert!("zz".parse::<Combinator>().is_err());
  }
}
