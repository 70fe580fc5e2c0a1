//! Submission record as returned by the grading backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grading::status::SubmissionStatus;

/// Final (or polled) state of one submission. The JSON blobs are opaque
/// here: they are shown, never parsed. Challenge references and timestamps
/// are kept in whatever shape the backend serialises them (ISO strings or
/// epoch numbers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub challenge_id: Option<Value>,
    #[serde(default)]
    pub challenge_title: Option<Value>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub visible_tests_json: Option<String>,
    #[serde(default)]
    pub hidden_tests_json: Option<String>,
    #[serde(default)]
    pub checkstyle_violations_json: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<Value>,
    #[serde(default)]
    pub completed_at: Option<Value>,
}

impl Submission {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
