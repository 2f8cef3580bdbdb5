use std::fs;
use std::path::Path;
use std::sync::Arc;

use ahash::HashMap;
use serde::Deserialize;

use super::{Distribution, LeafScores, ScoringOracle, Vector, sigmoid, softmax};
use crate::error::OracleError;
use crate::vocab::{Label, Vocab};

/// `weight · x + bias`, one row per output
#[derive(Debug, Clone, Deserialize)]
pub struct Linear {
  pub weight: Vec<Vec<f32>>,
  pub bias: Vec<f32>,
}

impl Linear {
  fn check(&self, what: &str, dim: usize) -> Result<(), OracleError> {
    if self.weight.len() != self.bias.len() {
      return Err(OracleError::Model(format!(
        "{}: {} weight rows but {} biases",
        what,
        self.weight.len(),
        self.bias.len()
      )));
    }
    for row in self.weight.iter() {
      if row.len() != dim {
        return Err(OracleError::DimensionMismatch {
          expected: dim,
          got: row.len(),
        });
      }
    }
    Ok(())
  }

  pub fn outputs(&self) -> usize {
    self.bias.len()
  }

  pub fn apply(&self, x: &[f32]) -> Vec<f64> {
    self
      .weight
      .iter()
      .zip(self.bias.iter())
      .map(|(row, b)| {
        row
          .iter()
          .zip(x.iter())
          .map(|(w, v)| f64::from(*w) * f64::from(*v))
          .sum::<f64>()
          + f64::from(*b)
      })
      .collect()
  }
}

/// On-disk form of a [`HolographicOracle`]
#[derive(Debug, Clone, Deserialize)]
pub struct HolographicModel {
  pub dim: usize,
  pub embeddings: HashMap<String, Vec<f32>>,
  #[serde(default)]
  pub unknown_embedding: Option<Vec<f32>>,
  pub word_labels: Vec<String>,
  pub word_classifier: Linear,
  pub phrase_labels: Vec<String>,
  pub phrase_classifier: Linear,
  pub span_classifier: Linear,
}

impl HolographicModel {
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OracleError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| OracleError::Io {
      path: path.display().to_string(),
      source: Arc::new(e),
    })?;
    serde_json::from_str(&s).map_err(|e| OracleError::Json {
      path: path.display().to_string(),
      source: Arc::new(e),
    })
  }

  /// Every supertag and phrase label the classifiers can predict
  pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
    self
      .word_labels
      .iter()
      .chain(self.phrase_labels.iter())
      .map(String::as_str)
  }
}

/// Circular correlation, the composition of holographic reduced representations:
/// `c[k] = Σ_i a[i] · b[(i + k) mod n]`
pub fn circular_correlation(a: &[f32], b: &[f32]) -> Result<Vec<f32>, OracleError> {
  if a.len() != b.len() {
    return Err(OracleError::DimensionMismatch {
      expected: a.len(),
      got: b.len(),
    });
  }
  let n = a.len();
  Ok(
    (0..n)
      .map(|k| (0..n).map(|i| a[i] * b[(i + k) % n]).sum())
      .collect(),
  )
}

/// Static word embeddings composed by circular correlation and scored with linear
/// classifiers: a word classifier for supertags, a span classifier read through a sigmoid,
/// and a phrase classifier read through a softmax.
#[derive(Debug, Clone)]
pub struct HolographicOracle {
  dim: usize,
  embeddings: HashMap<String, Vector>,
  unknown: Vector,
  word_labels: Vec<Label>,
  word_classifier: Linear,
  phrase_labels: Vec<Label>,
  phrase_classifier: Linear,
  span_classifier: Linear,
  vocab_len: usize,
}

impl HolographicOracle {
  /// Checks the model's shapes and maps its label lists onto `vocab`. Labels the vocabulary
  /// doesn't know end up as `<unk>`.
  pub fn from_model(model: HolographicModel, vocab: &Vocab) -> Result<Self, OracleError> {
    let dim = model.dim;
    model.word_classifier.check("word classifier", dim)?;
    model.phrase_classifier.check("phrase classifier", dim)?;
    model.span_classifier.check("span classifier", dim)?;
    if model.span_classifier.outputs() != 1 {
      return Err(OracleError::Model(
        "span classifier must have exactly one output".to_string(),
      ));
    }
    if model.word_classifier.outputs() != model.word_labels.len() {
      return Err(OracleError::DimensionMismatch {
        expected: model.word_labels.len(),
        got: model.word_classifier.outputs(),
      });
    }
    if model.phrase_classifier.outputs() != model.phrase_labels.len() {
      return Err(OracleError::DimensionMismatch {
        expected: model.phrase_labels.len(),
        got: model.phrase_classifier.outputs(),
      });
    }

    let embeddings = model
      .embeddings
      .into_iter()
      .map(|(word, v)| {
        if v.len() == dim {
          Ok((word, Vector::from(v)))
        } else {
          Err(OracleError::DimensionMismatch {
            expected: dim,
            got: v.len(),
          })
        }
      })
      .collect::<Result<HashMap<_, _>, _>>()?;
    let unknown = model.unknown_embedding.unwrap_or_else(|| vec![0.0; dim]);
    if unknown.len() != dim {
      return Err(OracleError::DimensionMismatch {
        expected: dim,
        got: unknown.len(),
      });
    }

    let labels = |names: &[String]| names.iter().map(|n| vocab.get(n)).collect::<Vec<_>>();
    Ok(Self {
      dim,
      embeddings,
      unknown: Arc::from(unknown),
      word_labels: labels(&model.word_labels),
      word_classifier: model.word_classifier,
      phrase_labels: labels(&model.phrase_labels),
      phrase_classifier: model.phrase_classifier,
      span_classifier: model.span_classifier,
      vocab_len: vocab.len(),
    })
  }

  pub fn from_json_file(path: impl AsRef<Path>, vocab: &Vocab) -> Result<Self, OracleError> {
    Self::from_model(HolographicModel::from_json_file(path)?, vocab)
  }

  fn embed(&self, word: &str) -> Vector {
    self
      .embeddings
      .get(word)
      .or_else(|| self.embeddings.get(&word.to_lowercase()))
      .unwrap_or(&self.unknown)
      .clone()
  }

  fn check_dim(&self, v: &Vector) -> Result<(), OracleError> {
    if v.len() == self.dim {
      Ok(())
    } else {
      Err(OracleError::DimensionMismatch {
        expected: self.dim,
        got: v.len(),
      })
    }
  }

  fn classify(&self, classifier: &Linear, labels: &[Label], v: &Vector) -> Result<Distribution, OracleError> {
    self.check_dim(v)?;
    let probs = softmax(&classifier.apply(v));
    Distribution::from_pairs(self.vocab_len, labels.iter().copied().zip(probs))
  }
}

impl ScoringOracle for HolographicOracle {
  fn score_leaf(&self, sentence: &[&str], position: usize) -> Result<LeafScores, OracleError> {
    let word = sentence.get(position).ok_or(OracleError::MissingPosition {
      position,
      len: sentence.len(),
    })?;
    let vector = self.embed(word);
    let distribution = self.classify(&self.word_classifier, &self.word_labels, &vector)?;
    Ok(LeafScores {
      vector,
      distribution,
    })
  }

  fn score_span(&self, vector: &Vector) -> Result<f64, OracleError> {
    self.check_dim(vector)?;
    Ok(sigmoid(self.span_classifier.apply(vector)[0]))
  }

  fn score_phrase_label(&self, vector: &Vector) -> Result<Distribution, OracleError> {
    self.classify(&self.phrase_classifier, &self.phrase_labels, vector)
  }

  fn compose(&self, left: &Vector, right: &Vector) -> Result<Vector, OracleError> {
    circular_correlation(left, right).map(Vector::from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  const MODEL: &str = r#"{
    "dim": 2,
    "embeddings": { "the": [1.0, 0.0], "cat": [0.0, 1.0] },
    "word_labels": ["<unk>", "NP/N", "N"],
    "word_classifier": {
      "weight": [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]],
      "bias": [-10.0, 0.0, 0.0]
    },
    "phrase_labels": ["<unk>", "NP"],
    "phrase_classifier": { "weight": [[0.0, 0.0], [1.0, 1.0]], "bias": [0.0, 0.0] },
    "span_classifier": { "weight": [[0.0, 0.0]], "bias": [0.0] }
  }"#;

  fn oracle() -> (Vocab, HolographicOracle) {
    let mut vocab = Vocab::new();
    vocab.intern("NP/N");
    vocab.intern("N");
    vocab.intern("NP");
    let model: HolographicModel = serde_json::from_str(MODEL).unwrap();
    let oracle = HolographicOracle::from_model(model, &vocab).unwrap();
    (vocab, oracle)
  }

  #[test]
  fn test_circular_correlation() {
    let c = circular_correlation(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
    // c[0] = 1*4 + 2*5 + 3*6, c[1] = 1*5 + 2*6 + 3*4, c[2] = 1*6 + 2*4 + 3*5
    assert_eq!(c, vec![32.0, 29.0, 29.0]);
    assert!(circular_correlation(&[1.0], &[1.0, 2.0]).is_err());
  }

  #[test]
  fn test_leaf_scores() {
    let (vocab, oracle) = oracle();
    let sentence = ["The", "cat"];
    let the = oracle.score_leaf(&sentence, 0).unwrap();
    assert_eq!(&*the.vector, &[1.0, 0.0]);
    assert_eq!(the.distribution.ranked()[0].0, vocab.get("NP/N"));

    let cat = oracle.score_leaf(&sentence, 1).unwrap();
    assert_eq!(cat.distribution.ranked()[0].0, vocab.get("N"));
    assert!(oracle.score_leaf(&sentence, 2).is_err());
  }

  #[test]
  fn test_span_and_phrase() {
    let (vocab, oracle) = oracle();
    let v = oracle
      .compose(&Vector::from(vec![1.0, 0.0]), &Vector::from(vec![0.0, 1.0]))
      .unwrap();
    assert_relative_eq!(oracle.score_span(&v).unwrap(), 0.5);
    let phrase = oracle.score_phrase_label(&v).unwrap();
    assert!(phrase.prob(vocab.get("NP")) > 0.5);
    assert!(oracle.score_span(&Vector::from(vec![1.0])).is_err());
  }

  #[test]
  fn test_model_labels() {
    let model: HolographicModel = serde_json::from_str(MODEL).unwrap();
    assert_eq!(
      model.labels().collect::<Vec<_>>(),
      vec!["<unk>", "NP/N", "N", "<unk>", "NP"]
    );
  }

  #[test]
  fn test_model_file_errors_keep_their_source() {
    use std::error::Error;

    let err = HolographicModel::from_json_file("/nonexistent/model.json").unwrap_err();
    assert!(matches!(err, OracleError::Io { .. }));
    assert!(err.source().is_some());

    let path = std::env::temp_dir().join(format!("ccgchart-model-{}.json", std::process::id()));
    fs::write(&path, r#"{ "dim": 2, "embeddings": "#).unwrap();
    let err = HolographicModel::from_json_file(&path).unwrap_err();
    fs::remove_file(&path).unwrap();
    assert!(matches!(err, OracleError::Json { .. }));
    assert!(err.source().is_some());

    // errors are cloned into every sentence that needed the model
    assert_eq!(err.clone().to_string(), err.to_string());
  }

  #[test]
  fn test_rejects_bad_shapes() {
    let vocab = Vocab::new();
    let mut model: HolographicModel = serde_json::from_str(MODEL).unwrap();
    model.span_classifier.bias.push(1.0);
    assert!(HolographicOracle::from_model(model, &vocab).is_err());

    let mut model: HolographicModel = serde_json::from_str(MODEL).unwrap();
    model.word_labels.pop();
    assert!(HolographicOracle::from_model(model, &vocab).is_err());
  }
}
