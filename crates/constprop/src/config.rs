//! # Pass Configuration

use serde::{Deserialize, Serialize};

use crate::error::{ConstPropError, ConstPropResult};

/// Configuration of the constant propagation pass
///
/// Missing keys take their default value when read from a pass
/// configuration object:
///
/// ```
/// use dexopt_constprop::ConstantPropagationConfig;
///
/// let json = r#"{ "replace_moves_with_consts": false }"#;
/// let config = ConstantPropagationConfig::from_json(json).unwrap();
/// assert!(!config.replace_moves_with_consts);
/// assert!(config.verify_code);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantPropagationConfig {
    /// Rewrite `move`/`move-wide` of a known constant into `const`/`const-wide`
    pub replace_moves_with_consts: bool,
    /// Validate the code of each method before and after the rewrite
    pub verify_code: bool,
}

impl Default for ConstantPropagationConfig {
    fn default() -> Self {
        Self {
            replace_moves_with_consts: true,
            verify_code: true,
        }
    }
}

impl ConstantPropagationConfig {
    /// Reads the configuration from a JSON object
    pub fn from_json(json: &str) -> ConstPropResult<Self> {
        serde_json::from_str(json).map_err(|e| ConstPropError::InvalidConfig(e.to_string()))
    }
}
