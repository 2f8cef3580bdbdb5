//! Line-oriented parsing of rule-frequency and head-statistics files
//!
//! A rule file has one rule per line, CCGbank style:
//!
//! ```text
//! 1708 # NP --> NP[nb]/N N
//! 102 # NP --> N
//! ```
//!
//! Six whitespace-separated tokens make a binary rule, five a unary rule. Only the frequency
//! and category positions are read; the separators can be anything.

use crate::rules::Rule;
use crate::vocab::UNKNOWN_STR;

/// What a single line of a rule file turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum RuleLine {
  Rule(Rule),
  /// Blank, or starts with `#`
  Skip,
  Malformed(String),
}

pub fn parse_rule_line(line: &str) -> RuleLine {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return RuleLine::Skip;
  }

  let tokens = line.split_whitespace().collect::<Vec<_>>();
  let freq = match tokens[0].parse::<u64>() {
    Ok(freq) => freq,
    Err(_) => return RuleLine::Malformed(format!("bad frequency '{}'", tokens[0])),
  };

  let rule = match tokens.len() {
    6 => Rule::Binary {
      freq,
      parent: tokens[2].to_string(),
      left: tokens[4].to_string(),
      right: tokens[5].to_string(),
    },
    5 => Rule::Unary {
      freq,
      parent: tokens[2].to_string(),
      child: tokens[4].to_string(),
    },
    n => return RuleLine::Malformed(format!("expected 5 or 6 tokens, got {}", n)),
  };

  let mentions_unknown = match &rule {
    Rule::Binary {
      parent,
      left,
      right,
      ..
    } => [parent, left, right].iter().any(|c| *c == UNKNOWN_STR),
    Rule::Unary { parent, child, .. } => [parent, child].iter().any(|c| *c == UNKNOWN_STR),
  };
  if mentions_unknown {
    return RuleLine::Malformed(format!("rule mentions {}", UNKNOWN_STR));
  }

  RuleLine::Rule(rule)
}

/// One entry of a head-statistics file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadEntry {
  pub left: String,
  pub right: String,
  pub parent: String,
  pub head: usize,
}

/// Parses `left right parent head` or `left right parent left_count right_count`.
/// With counts the majority side wins, ties going to the left child.
pub fn parse_head_line(line: &str) -> Result<Option<HeadEntry>, String> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return Ok(None);
  }

  let tokens = line.split_whitespace().collect::<Vec<_>>();
  let count = |s: &str| {
    s.parse::<u64>()
      .map_err(|_| format!("expected a count, got '{}'", s))
  };

  let head = match tokens.len() {
    4 => match tokens[3] {
      "0" => 0,
      "1" => 1,
      other => return Err(format!("head must be 0 or 1, got '{}'", other)),
    },
    5 => {
      if count(tokens[3])? >= count(tokens[4])? {
        0
      } else {
        1
      }
    }
    n => return Err(format!("expected 4 or 5 tokens, got {}", n)),
  };

  Ok(Some(HeadEntry {
    left: tokens[0].to_string(),
    right: tokens[1].to_string(),
    parent: tokens[2].to_string(),
    head,
  }))
}
