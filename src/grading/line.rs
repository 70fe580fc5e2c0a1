//! Grader log line classification.
//!
//! Raw grader output is untyped text. Each line is sorted into a
//! [`LineCategory`] by an ordered rule list; the first matching rule wins.
//!
//! | # | Rule | Category |
//! |---|------|----------|
//! | 1 | starts with `[PHASE]` | phase |
//! | 2 | starts with `[ERROR]` | error |
//! | 3 | contains `Tests run:` and `Failures:` | test |
//! | 4 | contains `BUILD SUCCESS` | success |
//! | 5 | contains `BUILD FAILURE` | error |
//! | 6 | contains `Checkstyle violations` | checkstyle |
//! | 7 | contains `[INFO] Running` | test |
//! | 8 | contains `[ERROR]` | error |
//! | 9 | anything else | log |
//!
//! Rule 3 precedes rule 7 because a finished test report also mentions
//! "Running". Rule 7 precedes rule 8, so a running-test notice that quotes
//! an error marker stays a test line.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const PHASE_MARKER: &str = "[PHASE]";
const ERROR_MARKER: &str = "[ERROR]";

/// Kind of a grader output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCategory {
    Phase,
    Test,
    Checkstyle,
    Log,
    Error,
    Success,
}

impl LineCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCategory::Phase => "phase",
            LineCategory::Test => "test",
            LineCategory::Checkstyle => "checkstyle",
            LineCategory::Log => "log",
            LineCategory::Error => "error",
            LineCategory::Success => "success",
        }
    }
}

impl std::fmt::Display for LineCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub category: LineCategory,
    pub text: String,
    /// Receipt time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl LogLine {
    /// Build a line with a known category, stamped now.
    pub fn new(category: LineCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    /// Classify `raw` and stamp it with the current time.
    pub fn classify(raw: &str) -> Self {
        Self::classify_at(raw, now_millis())
    }

    /// Classify `raw` with an explicit timestamp.
    pub fn classify_at(raw: &str, timestamp: u64) -> Self {
        let (category, text) = classify(raw);
        Self {
            category,
            text: text.to_string(),
            timestamp,
        }
    }
}

/// Category and display text of one line. A leading `[PHASE] ` or
/// `[ERROR] ` (marker plus one space) is removed from the text; a marker
/// glued to the text, as in `[PHASE]x`, still picks the category but the
/// text is left as is.
pub fn classify(raw: &str) -> (LineCategory, &str) {
    let text = raw.trim_end();

    if text.starts_with(PHASE_MARKER) {
        return (LineCategory::Phase, strip_marker(text, PHASE_MARKER));
    }
    if text.starts_with(ERROR_MARKER) {
        return (LineCategory::Error, strip_marker(text, ERROR_MARKER));
    }

    let category = if text.contains("Tests run:") && text.contains("Failures:") {
        LineCategory::Test
    } else if text.contains("BUILD SUCCESS") {
        LineCategory::Success
    } else if text.contains("BUILD FAILURE") {
        LineCategory::Error
    } else if text.contains("Checkstyle violations") {
        LineCategory::Checkstyle
    } else if text.contains("[INFO] Running") {
        LineCategory::Test
    } else if text.contains(ERROR_MARKER) {
        LineCategory::Error
    } else {
        LineCategory::Log
    };

    (category, text)
}

fn strip_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    text.strip_prefix(marker)
        .and_then(|rest| rest.strip_prefix(' '))
        .unwrap_or(text)
}

/// Split a `log` payload into lines, dropping blank fragments.
pub fn split_fragments(payload: &str) -> impl Iterator<Item = &str> {
    payload.split('\n').filter(|l| !l.trim().is_empty())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
