use serde::Deserialize;

use crate::error::{HistoryError, OperationResult};

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// History settings.
///
/// Usually embedded in an editor's settings file:
///
/// ```toml
/// max_undo = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Committed transactions kept on the undo stack. The oldest is dropped
    /// once the bound is exceeded.
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

impl HistoryConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> OperationResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| HistoryError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OperationResult {
        if self.max_undo == 0 {
            return Err(HistoryError::InvalidArgument(
                "max_undo must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
