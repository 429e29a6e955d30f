//! YAML output formatter

use crate::models::CodeMap;
use crate::output::FormatError;

/// Format a map as YAML
pub fn format_yaml(data: &CodeMap) -> Result<String, FormatError> {
    serde_yaml::to_string(data).map_err(FormatError::from)
}
