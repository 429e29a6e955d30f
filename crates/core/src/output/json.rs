//! JSON output formatter

use crate::models::CodeMap;
use crate::output::FormatError;

/// Format a map as pretty-printed JSON
pub fn format_json(data: &CodeMap) -> Result<String, FormatError> {
    serde_json::to_string_pretty(data).map_err(FormatError::from)
}
