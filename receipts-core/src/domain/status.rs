//! User-visible status messages

use serde::Serialize;

use super::result::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

/// Short-lived outcome message for the last operation of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    /// Message for a failed operation, by category only
    pub fn from_error(error: &Error) -> Self {
        Self::error(error.user_message())
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_uses_category_text() {
        let message = StatusMessage::from_error(&Error::upload_rejected("Failed to insert data: KeyError"));
        assert!(!message.is_success());
        assert_eq!(message.text, "Upload failed. Please try again.");
    }
}
