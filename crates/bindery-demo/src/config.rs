//! Environment configuration for the demo binary.
//!
//! | Variable               | Values                   | Default   |
//! |------------------------|--------------------------|-----------|
//! | `BINDERY_LOG`          | `EnvFilter` directives   | `info`    |
//! | `BINDERY_DISPATCH`     | `context` \| `immediate` | `context` |
//! | `BINDERY_CONTEXT_NAME` | thread / context name    | `gui`     |

use crate::error::{DemoError, Result};

pub const LOG_VAR: &str = "BINDERY_LOG";
pub const DISPATCH_VAR: &str = "BINDERY_DISPATCH";
pub const CONTEXT_NAME_VAR: &str = "BINDERY_CONTEXT_NAME";

const DEFAULT_LOG: &str = "info";
const DEFAULT_CONTEXT_NAME: &str = "gui";

/// Where view-model notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// A dedicated GUI context thread.
    #[default]
    Context,
    /// Synchronously on whichever thread made the change.
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub log_filter: String,
    pub dispatch: Dispatch,
    pub context_name: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG.to_string(),
            dispatch: Dispatch::default(),
            context_name: DEFAULT_CONTEXT_NAME.to_string(),
        }
    }
}

impl DemoConfig {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// [`DemoError::InvalidDispatch`] for an unrecognised dispatch mode.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_values(
            var(LOG_VAR).as_deref(),
            var(DISPATCH_VAR).as_deref(),
            var(CONTEXT_NAME_VAR).as_deref(),
        )
    }

    /// Build a config from raw variable values. Unset or blank values take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// [`DemoError::InvalidDispatch`] for an unrecognised dispatch mode.
    pub fn from_values(
        log: Option<&str>,
        dispatch: Option<&str>,
        context_name: Option<&str>,
    ) -> Result<Self> {
        let defaults = Self::default();
        let dispatch = match non_blank(dispatch) {
            None => defaults.dispatch,
            Some(raw) => parse_dispatch(raw)?,
        };
        Ok(Self {
            log_filter: non_blank(log).map_or(defaults.log_filter, str::to_string),
            dispatch,
            context_name: non_blank(context_name).map_or(defaults.context_name, str::to_string),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_dispatch(raw: &str) -> Result<Dispatch> {
    match raw.to_ascii_lowercase().as_str() {
        "context" | "gui" => Ok(Dispatch::Context),
        "immediate" | "inline" => Ok(Dispatch::Immediate),
        _ => Err(DemoError::InvalidDispatch {
            var: DISPATCH_VAR,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unset_values_use_defaults() {
        let config = DemoConfig::from_values(None, None, None).unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.dispatch, Dispatch::Context);
        assert_eq!(config.context_name, "gui");
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = DemoConfig::from_values(Some("  "), Some(""), Some("\t")).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = DemoConfig::from_values(
            Some("bindery_runtime=trace,warn"),
            Some("Immediate"),
            Some(" main-ui "),
        )
        .unwrap();
        assert_eq!(config.log_filter, "bindery_runtime=trace,warn");
        assert_eq!(config.dispatch, Dispatch::Immediate);
        assert_eq!(config.context_name, "main-ui");
    }

    #[test]
    fn unknown_dispatch_is_rejected() {
        let err = DemoConfig::from_values(None, Some("threadpool"), None).unwrap_err();
        assert!(matches!(
            err,
            DemoError::InvalidDispatch { var: DISPATCH_VAR, ref value } if value == "threadpool"
        ));
        assert!(err.to_string().contains("BINDERY_DISPATCH"));
    }

    proptest! {
        #[test]
        fn parsing_never_panics(log in ".{0,20}", dispatch in ".{0,12}", name in ".{0,12}") {
            let _ = DemoConfig::from_values(Some(&log), Some(&dispatch), Some(&name));
        }
    }
}
