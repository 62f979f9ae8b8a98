// Tracer configuration
//
// Suppression rules keep the tracer from observing itself and the host's
// hook-installation primitive; everything else tunes fault handling and
// memory bounds.

use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Owner reported by hosts for frames belonging to the tracer itself
pub const TRACER_OWNER: &str = "Tracer";

/// Drop raw events whose owner (and optionally method) match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressRule {
    /// Enclosing class or module name reported by the host
    pub owner: String,
    /// Method name; `None` matches every method of `owner`
    #[serde(default)]
    pub method: Option<String>,
}

impl SuppressRule {
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: None,
        }
    }

    pub fn method(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: Some(method.into()),
        }
    }

    pub fn matches(&self, owner: Option<&str>, method: Option<&str>) -> bool {
        if owner != Some(self.owner.as_str()) {
            return false;
        }
        match &self.method {
            None => true,
            Some(m) => method == Some(m.as_str()),
        }
    }
}

/// Configuration for a [`crate::Tracer`]
///
/// # Example
/// ```
/// use tracepoint::TracerConfig;
///
/// let config = TracerConfig::from_toml_str(r#"
///     isolate_observer_faults = false
///
///     [[suppress]]
///     owner = "Debugger"
/// "#).unwrap();
/// assert!(!config.isolate_observer_faults);
/// assert!(config.is_suppressed(Some("Debugger"), Some("step")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Raw events matching any rule are dropped before reconciliation
    ///
    /// Rules loaded from a file are added to the defaults.
    pub suppress: Vec<SuppressRule>,

    /// Catch observer panics, log them and keep delivering to the rest
    ///
    /// Default: true
    pub isolate_observer_faults: bool,

    /// Bound on the shadow call stack (0 = unbounded)
    ///
    /// Default: 0
    pub max_stack_depth: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            suppress: Self::default_rules(),
            isolate_observer_faults: true,
            max_stack_depth: 0,
        }
    }
}

impl TracerConfig {
    fn default_rules() -> Vec<SuppressRule> {
        vec![
            SuppressRule::owner(TRACER_OWNER),
            SuppressRule::method("Kernel", "set_trace_func"),
        ]
    }

    /// Parse a TOML document, layered over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: TracerConfig =
            toml::from_str(content).map_err(|e| TraceError::InvalidConfig(e.to_string()))?;
        for rule in Self::default_rules() {
            if !config.suppress.contains(&rule) {
                config.suppress.push(rule);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rule) = self.suppress.iter().find(|r| r.owner.trim().is_empty()) {
            return Err(TraceError::InvalidConfig(format!(
                "suppress rule has an empty owner (method: {:?})",
                rule.method
            )));
        }
        Ok(())
    }

    pub fn is_suppressed(&self, owner: Option<&str>, method: Option<&str>) -> bool {
        self.suppress.iter().any(|r| r.matches(owner, method))
    }
}
