use std::borrow::Cow;
use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Undoes Penn Treebank token escaping (`-LRB-` and friends, `\/`) so the oracle sees the
/// characters the word was actually written with.
///
/// ```
/// assert_eq!(ccgchart::utils::unescape_token("-LRB-"), "(");
/// assert_eq!(ccgchart::utils::unescape_token(r"1\/2"), "1/2");
/// assert_eq!(ccgchart::utils::unescape_token("cat"), "cat");
/// ```
pub fn unescape_token(token: &str) -> Cow<'_, str> {
  match token {
    "-LRB-" => Cow::Borrowed("("),
    "-RRB-" => Cow::Borrowed(")"),
    "-LCB-" => Cow::Borrowed("{"),
    "-RCB-" => Cow::Borrowed("}"),
    _ if token.contains(r"\/") => Cow::Owned(token.replace(r"\/", "/")),
    _ => Cow::Borrowed(token),
  }
}

#[test]
fn test_unescape_token() {
  assert_eq!(unescape_token("-RCB-"), "}");
  assert_eq!(unescape_token(r"and\/or"), "and/or");
  assert!(matches!(unescape_token("plain"), Cow::Borrowed(_)));
}
