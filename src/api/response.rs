//! Response payloads of the HTTP API.

use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Overall outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// JSON envelope shared by every route.
///
/// `mlOutput` is only present on successful classifications.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub result: Outcome,
    pub message: String,
    #[serde(rename = "mlOutput", skip_serializing_if = "Option::is_none")]
    pub ml_output: Option<ClassificationResult>,
}

impl ApiResponse {
    /// A success payload carrying classification scores.
    pub fn classified(output: ClassificationResult) -> Self {
        Self {
            result: Outcome::Success,
            message: "classification process successful.".to_string(),
            ml_output: Some(output),
        }
    }

    /// A success payload with only a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Success,
            message: message.into(),
            ml_output: None,
        }
    }

    /// A failure payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Failure,
            message: message.into(),
            ml_output: None,
        }
    }
}

/// Class scores keyed by label, in label order.
///
/// Scores are kept as strings, the form in which they are transported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    entries: Vec<(String, String)>,
}

impl ClassificationResult {
    /// Pairs each label with the score at the same position.
    ///
    /// # Errors
    ///
    /// Fails when the model produced a different number of scores than there
    /// are labels.
    pub fn from_scores(labels: &[String], scores: &[f32]) -> ClassifyResult<Self> {
        if labels.len() != scores.len() {
            return Err(ClassifyError::inference_error(
                "classifier",
                &format!(
                    "model produced {} scores for {} class labels",
                    scores.len(),
                    labels.len()
                ),
                SimpleError::new("score count mismatch"),
            ));
        }
        let entries = labels
            .iter()
            .zip(scores)
            .map(|(label, score)| (label.clone(), score.to_string()))
            .collect();
        Ok(Self { entries })
    }

    /// The score string of `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| s.as_str())
    }

    /// Labels in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ClassificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}
