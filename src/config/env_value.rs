// ABOUTME: Secret values that are either literal or read from the environment.
// ABOUTME: Lets registry passwords reference a variable instead of living in the file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required environment variable: {0}")]
pub struct MissingEnvVar(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String, MissingEnvVar> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default.clone().ok_or_else(|| MissingEnvVar(var.clone())),
            },
        }
    }

    /// Copy safe to show to API clients: literals are masked, env references kept.
    pub fn redacted(&self) -> Self {
        match self {
            EnvValue::Literal(_) => EnvValue::Literal("***".to_string()),
            EnvValue::FromEnv { var, .. } => EnvValue::FromEnv {
                var: var.clone(),
                default: None,
            },
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Literal(value.to_string())
    }
}
