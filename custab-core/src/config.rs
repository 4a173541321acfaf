//! Engine configuration.
//!
//! Two legacy behaviors are kept behind explicit switches instead of being
//! changed silently: module-agnostic baseline deletes and user-wide override
//! existence checks. Both default to the module-scoped behavior.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_BASELINE_DELETE_SCOPE: &str = "CUSTAB_BASELINE_DELETE_SCOPE";
pub const ENV_OVERRIDE_MATCH_SCOPE: &str = "CUSTAB_OVERRIDE_MATCH_SCOPE";

/// Which baseline rows a Delete row removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteScope {
    /// Rows matching `(module_id, value)`.
    #[default]
    Module,
    /// Rows matching `value` in any module.
    Global,
}

impl DeleteScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteScope::Module => "module",
            DeleteScope::Global => "global",
        }
    }
}

impl fmt::Display for DeleteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeleteScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "module" => Ok(DeleteScope::Module),
            "global" => Ok(DeleteScope::Global),
            _ => Err("expected module or global".to_string()),
        }
    }
}

/// Which override rows count as "already exists" when routing an override
/// batch to insert or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideMatchScope {
    /// The user's rows in the target module.
    #[default]
    Module,
    /// The user's rows in every module.
    #[serde(rename = "user", alias = "userWide")]
    UserWide,
}

impl OverrideMatchScope {
    pub fn as_str(self) -> &'static str {
        match self {
            OverrideMatchScope::Module => "module",
            OverrideMatchScope::UserWide => "user",
        }
    }
}

impl fmt::Display for OverrideMatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideMatchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "module" => Ok(OverrideMatchScope::Module),
            "user" | "userwide" | "user_wide" => Ok(OverrideMatchScope::UserWide),
            _ => Err("expected module or user".to_string()),
        }
    }
}

/// Engine behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub baseline_delete_scope: DeleteScope,
    pub override_match_scope: OverrideMatchScope,
}

impl LayoutConfig {
    /// Pre-switch deployment behavior: global deletes, user-wide
    /// existence checks.
    pub fn legacy() -> Self {
        Self {
            baseline_delete_scope: DeleteScope::Global,
            override_match_scope: OverrideMatchScope::UserWide,
        }
    }

    /// Load from `CUSTAB_*` environment variables. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_BASELINE_DELETE_SCOPE) {
            config.baseline_delete_scope = parse_field(ENV_BASELINE_DELETE_SCOPE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_OVERRIDE_MATCH_SCOPE) {
            config.override_match_scope = parse_field(ENV_OVERRIDE_MATCH_SCOPE, &raw)?;
        }
        Ok(config)
    }

    pub fn with_delete_scope(mut self, scope: DeleteScope) -> Self {
        self.baseline_delete_scope = scope;
        self
    }

    pub fn with_match_scope(mut self, scope: OverrideMatchScope) -> Self {
        self.override_match_scope = scope;
        self
    }
}

fn parse_field<T: FromStr<Err = String>>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|reason| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason,
    })
}
