//! PRD input form submitted by the UI.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product-requirement inputs collected by the web form.
///
/// Field names match the UI's camelCase JSON. Every field defaults to an
/// empty string so partially filled forms still deserialize; [`validate`]
/// enforces the required ones.
///
/// [`validate`]: PrdForm::validate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrdForm {
    pub feature_name: String,
    pub problem_statement: String,
    pub business_objective: String,
    pub success_metrics: String,
    pub target_persona: String,
    pub constraints: String,
}

/// Form validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Feature name or problem statement is blank.
    #[error("Feature Name and Problem Statement are required.")]
    MissingRequired,

    /// A single required field is blank.
    #[error("{0} is required.")]
    EmptyField(&'static str),
}

impl PrdForm {
    /// Check that the fields the PRD prompt cannot do without are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.feature_name.trim().is_empty() || self.problem_statement.trim().is_empty() {
            return Err(ValidationError::MissingRequired);
        }
        Ok(())
    }
}
