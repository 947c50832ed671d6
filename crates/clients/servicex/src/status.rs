//! Transformation status documents.

use std::fmt;

/// Response body of `GET /transformation/{id}/status`.
///
/// Every field is optional: older deployments report file counters only, and a request
/// that has not been looked up yet reports nothing about its files.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransformationStatus {
    /// Request status as named by ServiceX, e.g. `Running` or `Complete`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_remaining: Option<u64>,
    /// Files the transformer gave up on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_skipped: Option<u64>,
}

impl TransformationStatus {
    /// Derives the lifecycle state from the document.
    ///
    /// The `status` field wins when present. Without it, the file counters decide: a request
    /// with nothing left to process is done, unless files were skipped on the way.
    pub fn state(&self) -> TransformState {
        if let Some(status) = &self.status {
            return TransformState::from_status(status);
        }

        match self.files_remaining {
            None => TransformState::Pending,
            Some(remaining) if remaining > 0 => TransformState::Running,
            Some(_) if self.files_skipped.unwrap_or(0) > 0 => TransformState::Failed,
            Some(_) => TransformState::Done,
        }
    }
}

impl fmt::Display for TransformationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |value: Option<u64>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        write!(
            f,
            "status={} processed={} remaining={} skipped={}",
            self.status.as_deref().unwrap_or("?"),
            count(self.files_processed),
            count(self.files_remaining),
            count(self.files_skipped),
        )
    }
}

/// Lifecycle state of a transformation as reported by ServiceX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformState {
    Pending,
    Running,
    Done,
    Failed,
}

impl TransformState {
    /// Maps a ServiceX status name, ignoring case.
    ///
    /// Unrecognized names count as [`TransformState::Running`]: the request exists and is not
    /// known to be finished.
    pub fn from_status(status: &str) -> Self {
        let status = status.trim().to_ascii_lowercase();
        match status.as_str() {
            "submitted" | "lookup" | "pending" | "waiting" => TransformState::Pending,
            "running" => TransformState::Running,
            "complete" | "done" => TransformState::Done,
            "fatal" | "failed" | "canceled" | "cancelled" => TransformState::Failed,
            other => {
                tracing::debug!(status = other, "Unrecognized transformation status, assuming running");
                TransformState::Running
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransformState::Done | TransformState::Failed)
    }
}
