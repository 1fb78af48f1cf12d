//! A single immutable config value with a validating constructor, in place
//! of the teacher's fluent `AgentConfig` setters (spec §9's re-
//! architectural guidance).

use agexec_core::Result;

/// Configuration for one root execution. Built once via [`AgentConfig::build`],
/// never mutated afterward.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub default_model: String,
    pub has_validator: bool,
    pub has_termination_section: bool,
}

impl AgentConfig {
    /// Construct and validate. A validator requires a termination section
    /// to be configured — without one there is nothing to call
    /// `should_terminate` on when the validator accepts an answer.
    pub fn build(
        default_model: impl Into<String>,
        has_validator: bool,
        has_termination_section: bool,
    ) -> Result<Self> {
        if has_validator && !has_termination_section {
            return Err(agexec_core::Error::config(
                "a validator requires a termination section to be configured",
            ));
        }
        Ok(Self {
            default_model: default_model.into(),
            has_validator,
            has_termination_section,
        })
    }
}
