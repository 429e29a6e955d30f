//! Configuration for the map scanner

use crate::tagger;
use std::path::PathBuf;

/// Configuration for a map scan
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Where the map file will be written; `None` when the output goes to
    /// stdout. The scanner uses this to keep the map itself (and its
    /// backup) off the map.
    pub output_path: Option<PathBuf>,

    /// Tagger executable, resolved through `PATH`
    pub tagger_program: String,

    /// Include symbols that would normally be filtered out
    pub debug: bool,

    /// Number of threads for per-file assembly
    pub threads: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_path: Some(PathBuf::from("MAP.txt")),
            tagger_program: tagger::DEFAULT_PROGRAM.to_string(),
            debug: false,
            threads: num_cpus(),
        }
    }
}

impl MapConfig {
    /// Create new config with root directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Set the output path (builder pattern)
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    /// Set the tagger executable (builder pattern)
    pub fn with_tagger_program(mut self, program: String) -> Self {
        self.tagger_program = program;
        self
    }

    /// Set debug mode (builder pattern)
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set number of threads (builder pattern)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Get number of available CPUs
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MapConfig::new(PathBuf::from("/test"))
            .with_threads(2)
            .with_debug(true)
            .with_output_path(None);

        assert_eq!(config.root, PathBuf::from("/test"));
        assert_eq!(config.threads, 2);
        assert!(config.debug);
        assert!(config.output_path.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.tagger_program, "ctags");
        assert_eq!(config.output_path, Some(PathBuf::from("MAP.txt")));
        assert!(config.threads >= 1);
    }
}
