//! codemap_core - Core library for repository code maps
//!
//! This crate generates a symbol map of a repository: it discovers the
//! files worth mapping (honoring layered `.gitignore` and `.mapignore`
//! rules), runs universal-ctags over the tree, builds a per-file symbol
//! hierarchy from the tag entries, and renders the result.
//!
//! # Features
//!
//! - **Layered ignore rules**: `.gitignore` and `.mapignore` files at any
//!   depth, resolved with git-compatible precedence.
//! - **Symbol hierarchies**: scope strings from the tagger become a tree
//!   of classes, methods, and variables per file.
//! - **Language handlers**: OCaml, shell, and Markdown get bespoke
//!   treatment; everything else goes through a generic handler.
//! - **Multiple output formats**: the classic text map plus JSON, YAML,
//!   and a summary view.
//!
//! # Example
//!
//! ```rust,no_run
//! use codemap_core::{format_output, MapConfig, MapScanner, OutputFormat};
//! use std::path::PathBuf;
//!
//! let config = MapConfig::new(PathBuf::from("."));
//! let scanner = MapScanner::new(config);
//!
//! let map = scanner.scan().unwrap();
//!
//! let text = format_output(&map, OutputFormat::Text).unwrap();
//! println!("{}", text);
//! ```

pub mod config;
pub mod engine;
pub mod handlers;
pub mod ignore;
pub mod models;
pub mod output;
pub mod symbols;
pub mod tagger;

// Re-exports for convenience
pub use config::MapConfig;
pub use engine::{FileStatus, MapScanner, ScanError};
pub use handlers::{GenericHandler, LanguageHandler, ProcessDecision};
pub use ignore::{IgnoreError, IgnoreResolver, RuleCorpus, RuleFamily};
pub use models::{
    classify, Category, CodeMap, FileMap, Heading, MapMetadata, MapNode, MapSection, MapStats,
    ModuleSection, TagEntry,
};
pub use output::{format_output, FormatError, OutputFormat};
pub use symbols::{Symbol, SymbolId, SymbolTree};
pub use tagger::{run_tagger, TaggerError};
