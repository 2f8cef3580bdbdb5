//! CCG category syntax: `S[dcl]\NP`, `(S\NP)/NP`, `NP[conj]`, `conj`, `,` ...
//!
//! Categories in the rule file are opaque labels as far as the chart is concerned. This module
//! only exists so that the grammar loader can tell which combinator licensed a rule.

use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Atoms that coordinate two conjuncts
const CONJUNCTIONS: &[&str] = &["conj", ",", ";"];

/// Atoms that are absorbed by punctuation rules
const PUNCTUATION: &[&str] = &[",", ".", ":", ";", "LRB", "RRB", "LQU", "RQU", "``", "''"];

/// Feature value that matches any other feature
const VARIABLE_FEATURE: &str = "X";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Slash {
  Forward,
  Backward,
}

impl fmt::Display for Slash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Forward => write!(f, "/"),
      Self::Backward => write!(f, "\\"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SynCat {
  /// A basic category with an optional feature: `S[dcl]`, `NP`, `conj`
  Atom { base: String, feature: Option<String> },
  /// `result/arg` or `result\arg`
  Functor {
    result: Box<SynCat>,
    slash: Slash,
    arg: Box<SynCat>,
  },
  /// A conjunct that's waiting for its left partner: `NP[conj]`
  Conj(Box<SynCat>),
}

impl SynCat {
  pub fn atom(base: &str) -> Self {
    Self::Atom {
      base: base.to_string(),
      feature: None,
    }
  }

  pub fn functor(result: SynCat, slash: Slash, arg: SynCat) -> Self {
    Self::Functor {
      result: Box::new(result),
      slash,
      arg: Box::new(arg),
    }
  }

  pub fn as_functor(&self) -> Option<(&SynCat, Slash, &SynCat)> {
    match self {
      Self::Functor { result, slash, arg } => Some((result, *slash, arg)),
      _ => None,
    }
  }

  /// `Some((result, arg))` if this is a functor with the given slash
  pub fn split(&self, wanted: Slash) -> Option<(&SynCat, &SynCat)> {
    match self.as_functor() {
      Some((result, slash, arg)) if slash == wanted => Some((result, arg)),
      _ => None,
    }
  }

  pub fn as_conj(&self) -> Option<&SynCat> {
    match self {
      Self::Conj(inner) => Some(inner),
      _ => None,
    }
  }

  fn base(&self) -> Option<&str> {
    match self {
      Self::Atom { base, .. } => Some(base),
      _ => None,
    }
  }

  pub fn is_conjunction(&self) -> bool {
    self.base().is_some_and(|b| CONJUNCTIONS.contains(&b))
  }

  pub fn is_punctuation(&self) -> bool {
    self.base().is_some_and(|b| PUNCTUATION.contains(&b))
  }

  /// Structural equality where atom features only have to agree when both sides carry one.
  /// `NP[nb]` matches `NP`, `S[X]` matches `S[dcl]`, `S[dcl]` doesn't match `S[b]`.
  pub fn matches(&self, other: &SynCat) -> bool {
    match (self, other) {
      (
        Self::Atom {
          base: b1,
          feature: f1,
        },
        Self::Atom {
          base: b2,
          feature: f2,
        },
      ) => {
        b1 == b2
          && match (f1, f2) {
            (Some(f1), Some(f2)) => f1 == f2 || f1 == VARIABLE_FEATURE || f2 == VARIABLE_FEATURE,
            _ => true,
          }
      }
      (
        Self::Functor {
          result: r1,
          slash: s1,
          arg: a1,
        },
        Self::Functor {
          result: r2,
          slash: s2,
          arg: a2,
        },
      ) => s1 == s2 && r1.matches(r2) && a1.matches(a2),
      (Self::Conj(c1), Self::Conj(c2)) => c1.matches(c2),
      _ => false,
    }
  }
}

impl fmt::Display for SynCat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Atom {
        base,
        feature: Some(feature),
      } => write!(f, "{}[{}]", base, feature),
      Self::Atom { base, feature: None } => write!(f, "{}", base),
      Self::Functor { result, slash, arg } => {
        write_operand(f, result)?;
        write!(f, "{}", slash)?;
        write_operand(f, arg)
      }
      Self::Conj(inner) => {
        if inner.as_functor().is_some() {
          write!(f, "({})[conj]", inner)
        } else {
          write!(f, "{}[conj]", inner)
        }
      }
    }
  }
}

fn write_operand(f: &mut fmt::Formatter<'_>, cat: &SynCat) -> fmt::Result {
  if cat.as_functor().is_some() {
    write!(f, "({})", cat)
  } else {
    write!(f, "{}", cat)
  }
}

type ParseResult<'a, T> = Result<(T, &'a str), String>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex anchored at the start of `s`
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> (Option<&'a str>, &'a str) {
  match re.find(s) {
    Some(m) if m.start() == 0 => (Some(m.as_str()), &s[m.end()..]),
    _ => (None, s),
  }
}

fn needed_re<'a>(re: &'static Regex, s: &'a str, what: &str) -> ParseResult<'a, &'a str> {
  match optional_re(re, s) {
    (Some(m), rest) => Ok((m, rest)),
    (None, _) => Err(format!("expected {} at '{}'", what, s)),
  }
}

fn parse_atom(s: &str) -> ParseResult<'_, SynCat> {
  regex_static!(BASE, r"[^()\[\]/\\\s]+");
  regex_static!(FEATURE, r"\[[^\[\]\s]+\]");

  let (base, s) = needed_re(&BASE, s, "atomic category")?;
  let (feature, s) = optional_re(&FEATURE, s);
  let feature = feature.map(|f| f[1..f.len() - 1].to_string());

  let atom = SynCat::Atom {
    base: base.to_string(),
    feature: None,
  };
  match feature.as_deref() {
    Some("conj") => Ok((SynCat::Conj(Box::new(atom)), s)),
    Some(_) => Ok((
      SynCat::Atom {
        base: base.to_string(),
        feature,
      },
      s,
    )),
    None => Ok((atom, s)),
  }
}

fn parse_operand(s: &str) -> ParseResult<'_, SynCat> {
  if let Some(rest) = s.strip_prefix('(') {
    let (cat, rest) = parse_expr(rest)?;
    let rest = rest
      .strip_prefix(')')
      .ok_or_else(|| format!("unclosed parenthesis at '{}'", rest))?;
    if let Some(rest) = rest.strip_prefix("[conj]") {
      Ok((SynCat::Conj(Box::new(cat)), rest))
    } else {
      Ok((cat, rest))
    }
  } else {
    parse_atom(s)
  }
}

/// Slashes associate to the left: `S\NP/NP` is `(S\NP)/NP`
fn parse_expr(s: &str) -> ParseResult<'_, SynCat> {
  let (mut cat, mut rem) = parse_operand(s)?;
  loop {
    let slash = match rem.chars().next() {
      Some('/') => Slash::Forward,
      Some('\\') => Slash::Backward,
      _ => return Ok((cat, rem)),
    };
    let (arg, rest) = parse_operand(&rem[1..])?;
    cat = SynCat::functor(cat, slash, arg);
    rem = rest;
  }
}

/// CCGbank writes `S[dcl]\NP[conj]` for the conjunct `(S[dcl]\NP)[conj]`
fn lift_conj(cat: SynCat) -> SynCat {
  match cat {
    SynCat::Functor { result, slash, arg } => match *arg {
      SynCat::Conj(inner) => SynCat::Conj(Box::new(SynCat::Functor {
        result,
        slash,
        arg: inner,
      })),
      arg => SynCat::Functor {
        result,
        slash,
        arg: Box::new(arg),
      },
    },
    other => other,
  }
}

impl FromStr for SynCat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (cat, rest) = parse_expr(s.trim())?;
    if !rest.is_empty() {
      return Err(format!("trailing input '{}' in category '{}'", rest, s));
    }
    Ok(lift_conj(cat))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cat(s: &str) -> SynCat {
    s.parse().unwrap()
  }

  #[test]
  fn test_parse_functors() {
    let tv = cat(r"(S[dcl]\NP)/NP");
    let (result, slash, arg) = tv.as_functor().unwrap();
    assert_eq!(slash, Slash::Forward);
    assert_eq!(arg, &cat("NP"));
    assert_eq!(result, &SynCat::functor(cat("S[dcl]"), Slash::Backward, cat("NP")));

    // left associative
    assert_eq!(cat(r"S\NP/NP"), cat(r"(S\NP)/NP"));
    assert_eq!(tv.to_string(), r"(S[dcl]\NP)/NP");
  }

  #[test]
  fn test_parse_punctuation_and_conj() {
    assert!(cat(",").is_punctuation());
    assert!(cat(",").is_conjunction());
    assert!(cat("conj").is_conjunction());
    assert!(!cat("conj").is_punctuation());

    assert_eq!(cat("NP[conj]"), SynCat::Conj(Box::new(cat("NP"))));
    let vp_conj = cat(r"S[dcl]\NP[conj]");
    assert_eq!(vp_conj.as_conj(), Some(&cat(r"S[dcl]\NP")));
    assert_eq!(cat(r"(S[dcl]\NP)[conj]"), vp_conj);
  }

  #[test]
  fn test_feature_matching() {
    assert!(cat("NP[nb]").matches(&cat("NP")));
    assert!(cat("S[X]").matches(&cat("S[dcl]")));
    assert!(!cat("S[dcl]").matches(&cat("S[b]")));
    assert!(!cat("N").matches(&cat("NP")));
    assert!(cat(r"(S[dcl]\NP)/NP").matches(&cat(r"(S\NP)/NP")));
    assert!(!cat(r"S/NP").matches(&cat(r"S\NP")));
  }

  #[test]
  fn test_parse_errors() {
    assert!("(S\\NP".parse::<SynCat>().is_err());
    assert!("S/".parse::<SynCat>().is_err());
    assert!("".parse::<SynCat>().is_err());
  }
}
