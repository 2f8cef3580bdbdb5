use std::fmt;

use ahash::HashMap;

/// Name of the reserved label that absorbs everything outside the vocabulary
pub const UNKNOWN_STR: &str = "<unk>";

/// An interned grammatical category. Cheap to copy and hash; resolve it through the
/// [`Vocab`] that produced it to get the category string back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub u32);

impl Label {
  /// The reserved `<unk>` label. Never chosen as a parse category.
  pub const UNKNOWN: Label = Label(0);

  pub fn index(self) -> usize {
    self.0 as usize
  }

  pub fn is_unknown(self) -> bool {
    self == Self::UNKNOWN
  }
}

/// Closed vocabulary of category labels, `<unk>` at id 0
#[derive(Debug, Clone)]
pub struct Vocab {
  names: Vec<String>,
  ids: HashMap<String, Label>,
}

impl Default for Vocab {
  fn default() -> Self {
    let mut vocab = Self {
      names: Vec::new(),
      ids: HashMap::default(),
    };
    vocab.intern(UNKNOWN_STR);
    vocab
  }
}

impl Vocab {
  pub fn new() -> Self {
    Default::default()
  }

  /// Returns the label for `name`, adding it if it's new
  pub fn intern(&mut self, name: &str) -> Label {
    if let Some(label) = self.ids.get(name) {
      return *label;
    }
    let label = Label(self.names.len() as u32);
    self.names.push(name.to_string());
    self.ids.insert(name.to_string(), label);
    label
  }

  /// Looks up `name` without growing the vocabulary; unseen names map to [`Label::UNKNOWN`]
  pub fn get(&self, name: &str) -> Label {
    self.ids.get(name).copied().unwrap_or(Label::UNKNOWN)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.ids.contains_key(name)
  }

  pub fn name(&self, label: Label) -> &str {
    self
      .names
      .get(label.index())
      .map(String::as_str)
      .unwrap_or(UNKNOWN_STR)
  }

  /// Number of labels, `<unk>` included
  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() <= 1
  }

  pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
    (0..self.names.len() as u32).map(Label)
  }
}

impl fmt::Display for Vocab {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, name) in self.names.iter().enumerate() {
      writeln!(f, "{}\t{}", idx, name)?;
    }
    Ok(())
  }
}

#[test]
fn test_intern_is_stable() {
  let mut vocab = Vocab::new();
  assert_eq!(vocab.get(UNKNOWN_STR), Label::UNKNOWN);

  let np = vocab.intern("NP");
  let n = vocab.intern("N");
  assert_eq!(vocab.intern("NP"), np);
  assert_ne!(np, n);
  assert_eq!(vocab.len(), 3);
  assert_eq!(vocab.name(n), "N");
  assert_eq!(vocab.get("S[dcl]"), Label::UNKNOWN);
  assert_eq!(vocab.name(Label(99)), UNKNOWN_STR);
}
