use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::ApprovalStatus;
use crate::store::StoreError;

/// One violated field constraint. `create_request` collects every violation
/// rather than stopping at the first, so callers can correct the whole form
/// in one pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    let rendered: Vec<String> = violations.iter().map(ToString::to_string).collect();
    rendered.join("; ")
}

/// The workflow error taxonomy. Authorization and validation errors carry
/// enough detail to correct the input; persistence failures are kept distinct
/// so callers can tell "your action did not take effect" from "your action
/// took effect but a downstream notice may not have been sent" (notification
/// failures are logged, never surfaced here).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("caller is not authenticated")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {}", render_violations(.0))]
    Validation(Vec<FieldViolation>),
    #[error("approval request `{0}` was not found")]
    NotFound(String),
    #[error("request is {status}; only pending requests accept a decision")]
    InvalidState { status: ApprovalStatus },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            // A decision conflict means another caller already resolved the
            // request; surfaced as the post-transition InvalidState by the
            // engine, which re-reads the current status. This fallback covers
            // conversions outside that path.
            StoreError::Conflict => {
                Self::Persistence("decision conflict: request is no longer pending".to_string())
            }
            StoreError::Unavailable(message) => Self::Persistence(message),
            StoreError::Decode(message) => Self::Persistence(format!("decode error: {message}")),
        }
    }
}
