//! Output formatting module
//!
//! This module provides formatters for the classic text map plus JSON,
//! YAML, and summary renderings of a [`CodeMap`].

mod json;
mod text;
mod yaml;

pub use json::format_json;
pub use text::format_text;
pub use yaml::format_yaml;

use crate::models::CodeMap;
use thiserror::Error;

/// Output format errors
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),
}

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Classic text map
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text summary
    Summary,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

/// Format a map in the specified format
pub fn format_output(data: &CodeMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Text => format_text(data),
        OutputFormat::Json => format_json(data),
        OutputFormat::Yaml => format_yaml(data),
        OutputFormat::Summary => Ok(format_summary(data)),
    }
}

/// Format as plain text summary
fn format_summary(data: &CodeMap) -> String {
    let mut output = String::new();

    output.push_str("Map Scan Results\n");
    output.push_str("================\n\n");
    output.push_str(&format!("Root: {}\n", data.root.display()));
    output.push_str(&format!("Total Files: {}\n", data.stats.total_files));
    output.push_str(&format!(
        "Files With Symbols: {}\n",
        data.stats.files_with_symbols
    ));
    output.push_str(&format!("Total Symbols: {}\n", data.stats.total_symbols));
    output.push_str(&format!(
        "\nScan Duration: {}ms\n",
        data.metadata.scan_duration_ms
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MapMetadata, MapStats};
    use std::path::PathBuf;

    #[test]
    fn test_format_summary() {
        let data = CodeMap {
            root: PathBuf::from("/repo"),
            files: vec![],
            stats: MapStats {
                total_files: 3,
                files_with_symbols: 2,
                total_symbols: 14,
            },
            metadata: MapMetadata {
                scan_duration_ms: 42,
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                tool_version: "0.1.0".to_string(),
            },
        };

        let summary = format_summary(&data);
        assert!(summary.contains("Total Files: 3"));
        assert!(summary.contains("Total Symbols: 14"));
        assert!(summary.contains("Scan Duration: 42ms"));
    }
}
