// crates/apk-probe-core/src/env_audit.rs
// ============================================================================
// Module: Environment Audit
// Description: Presence checks for the service's backend variables.
// Purpose: Flag deployments missing public backend config or credentials.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Checks that every required public variable is set and that at least one
//! credential variable is set. Values are treated as secrets: a preview shows
//! at most a four-character prefix plus an ellipsis, short values show only
//! the ellipsis, and credential values are never previewed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::config::EnvAuditConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters revealed in a preview.
const PREVIEW_CHARS: usize = 4;
/// Values at or below this length are fully masked.
const MIN_PREVIEW_LEN: usize = 8;
/// Mask suffix appended to previews.
const ELLIPSIS: &str = "\u{2026}";

// ============================================================================
// SECTION: Report
// ============================================================================

/// Presence of one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVarStatus {
    /// Variable name.
    pub name: String,
    /// Whether the variable is set and non-empty.
    pub present: bool,
    /// Redacted preview; always `None` for credentials.
    pub preview: Option<String>,
}

/// Result of one environment audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvAuditReport {
    /// Required public variables.
    pub required: Vec<EnvVarStatus>,
    /// Credential variables.
    pub credentials: Vec<EnvVarStatus>,
}

impl EnvAuditReport {
    /// Returns the names of missing required variables.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&str> {
        self.required.iter().filter(|var| !var.present).map(|var| var.name.as_str()).collect()
    }

    /// Returns true when at least one credential variable is set.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credentials.iter().any(|var| var.present)
    }

    /// Returns true when all required variables and a credential are set.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.missing_required().is_empty() && self.has_credential()
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Environment audit over configured variable lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAudit {
    /// Required variable names.
    required: Vec<String>,
    /// Credential variable names.
    credentials: Vec<String>,
}

impl EnvAudit {
    /// Creates an audit from configuration.
    #[must_use]
    pub fn from_config(config: &EnvAuditConfig) -> Self {
        Self {
            required: config.required.clone(),
            credentials: config.credentials.clone(),
        }
    }

    /// Audits the process environment.
    #[must_use]
    pub fn run(&self) -> EnvAuditReport {
        self.run_with(|name| std::env::var(name).ok())
    }

    /// Audits using `lookup` as the variable source.
    #[must_use]
    pub fn run_with<F>(&self, lookup: F) -> EnvAuditReport
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_of = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = self
            .required
            .iter()
            .map(|name| {
                let value = value_of(name);
                EnvVarStatus {
                    name: name.clone(),
                    present: value.is_some(),
                    preview: value.as_deref().map(preview),
                }
            })
            .collect();
        let credentials = self
            .credentials
            .iter()
            .map(|name| EnvVarStatus {
                name: name.clone(),
                present: value_of(name).is_some(),
                preview: None,
            })
            .collect();
        EnvAuditReport {
            required,
            credentials,
        }
    }
}

/// Returns a redacted preview of `value`.
fn preview(value: &str) -> String {
    if value.chars().count() <= MIN_PREVIEW_LEN {
        return ELLIPSIS.to_string();
    }
    let prefix: String = value.chars().take(PREVIEW_CHARS).collect();
    format!("{prefix}{ELLIPSIS}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
