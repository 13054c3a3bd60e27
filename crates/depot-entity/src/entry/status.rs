//! Upload session status.

use serde::{Deserialize, Serialize};

/// Status of an upload session.
///
/// Transitions: `Initiated → Uploading → Completed`, with
/// `Uploading → Canceled` and `Uploading → Paused → Uploading` side
/// transitions. `Completed` and `Canceled` are terminal. Folders are
/// created directly in `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Session created, no chunks accepted yet.
    Initiated,
    /// At least one chunk accepted.
    Uploading,
    /// Client paused the transfer; chunks may be re-sent on resume.
    Paused,
    /// All content stored and accounted.
    Completed,
    /// Session canceled; entry is being torn down.
    Canceled,
}

impl UploadStatus {
    /// Return the status as a string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Uploading => "uploading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// Parse a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(Self::Initiated),
            "uploading" => Some(Self::Uploading),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Whether the session can accept further chunks.
    pub fn accepts_chunks(&self) -> bool {
        matches!(self, Self::Initiated | Self::Uploading | Self::Paused)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_statuses() {
        for status in [
            UploadStatus::Initiated,
            UploadStatus::Uploading,
            UploadStatus::Paused,
            UploadStatus::Completed,
            UploadStatus::Canceled,
        ] {
            assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UploadStatus::parse("garbage"), None);
    }

    #[test]
    fn test_terminal_statuses_reject_chunks() {
        assert!(!UploadStatus::Completed.accepts_chunks());
        assert!(!UploadStatus::Canceled.accepts_chunks());
        assert!(UploadStatus::Paused.accepts_chunks());
    }
}
