use serde::{Deserialize, Serialize};

use super::Session;

/// Caller context; `active_ids` are the sessions currently selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentContext {
    #[serde(default)]
    pub active_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub session_ids: Option<Vec<String>>,
    #[serde(default)]
    pub attendee_ids: Vec<String>,
    #[serde(default)]
    pub context: EnrollmentContext,
}

impl EnrollmentRequest {
    /// Explicit sessions win over the context selection.
    pub fn target_sessions(&self) -> Vec<String> {
        let mut ids = match &self.session_ids {
            Some(ids) => ids.clone(),
            None => self.context.active_ids.clone(),
        };
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentFailure {
    pub session_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWarning {
    pub session_id: String,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentReport {
    pub enrolled: Vec<Session>,
    pub failed: Vec<EnrollmentFailure>,
    pub warnings: Vec<SessionWarning>,
}
