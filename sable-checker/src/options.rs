use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Primitive;

/// What an `if`/`while` condition is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionPolicy {
    /// Every type is accepted.
    #[default]
    Any,
    /// The condition type must satisfy the type model's truthiness predicate.
    Truthy,
    /// The condition must be exactly `bool`.
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Width adopted by integer literals without an integer expected type.
    pub default_integer: Primitive,
    /// Width adopted by float literals without a float expected type.
    pub default_float: Primitive,
    pub condition_policy: ConditionPolicy,
    /// Check `Array`/`Map` member access against the built-in member table
    /// instead of yielding Unknown.
    pub validate_container_members: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            default_integer: Primitive::I32,
            default_float: Primitive::F64,
            condition_policy: ConditionPolicy::Any,
            validate_container_members: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid checker options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("default_integer must be an integer type, found '{0}'")]
    NotAnInteger(Primitive),
    #[error("default_float must be a float type, found '{0}'")]
    NotAFloat(Primitive),
}

impl CheckOptions {
    pub fn from_json_str(input: &str) -> Result<Self, OptionsError> {
        let options: CheckOptions = serde_json::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if !self.default_integer.is_integer() {
            return Err(OptionsError::NotAnInteger(self.default_integer));
        }
        if !self.default_float.is_float() {
            return Err(OptionsError::NotAFloat(self.default_float));
        }
        Ok(())
    }
}
