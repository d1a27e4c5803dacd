use serde::{Deserialize, Serialize};

/// Body returned by the sheet endpoint for a POST.
///
/// Every field is optional on the client side: a 200 response without a
/// `success` flag counts as accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn saved() -> Self {
        Self {
            success: Some(true),
            message: Some("Entry saved successfully".to_string()),
            error: None,
        }
    }

    pub fn empty_submission() -> Self {
        Self {
            success: Some(false),
            message: None,
            error: Some("No data provided".to_string()),
        }
    }

    pub fn save_failed(error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            message: Some("Failed to save entry".to_string()),
            error: Some(error.into()),
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.success == Some(false)
    }
}

/// Body returned by the sheet endpoint for a GET health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}
