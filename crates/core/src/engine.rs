//! Map engine
//!
//! This module drives a mapping run: file discovery against the ignore
//! rules, the tagger subprocess, symbol tree construction per file, and
//! assembly of the final [`CodeMap`].

use crate::config::MapConfig;
use crate::handlers::{
    builtin_handlers, GenericHandler, LanguageHandler, MarkdownHandler, ProcessDecision,
};
use crate::ignore::{IgnoreError, IgnoreResolver};
use crate::models::{
    classify, CodeMap, FileMap, MapMetadata, MapNode, MapSection, MapStats, ModuleSection,
    TagEntry,
};
use crate::symbols::{Symbol, SymbolId, SymbolTree};
use crate::tagger::{self, TaggerError};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

/// Scanner errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ignore error: {0}")]
    IgnoreError(#[from] IgnoreError),

    #[error("Tagger error: {0}")]
    TaggerError(#[from] TaggerError),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

/// Inclusion status of one file, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Canonical path
    pub path: PathBuf,
    /// Path relative to the repository root (or the scan root when no
    /// repository was found); `None` when the file lies outside it
    pub display: Option<PathBuf>,
    /// Whether the file would appear on the map
    pub included: bool,
}

/// Flat symbol record for files owned by a language-specific handler.
struct ModuleRecord {
    module: String,
    category: String,
    name: String,
    line: usize,
    description: String,
}

/// Per-file accumulation during the entry pass.
#[derive(Default)]
struct FileState {
    tree: SymbolTree,
    records: Vec<ModuleRecord>,
}

/// Main map scanner
pub struct MapScanner {
    config: MapConfig,
    handlers: Vec<(&'static str, Box<dyn LanguageHandler>)>,
    generic: GenericHandler,
}

impl MapScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: MapConfig) -> Self {
        Self {
            generic: GenericHandler::new(config.debug),
            handlers: builtin_handlers(),
            config,
        }
    }

    /// Scan the configured directory and return the assembled map
    pub fn scan(&self) -> Result<CodeMap, ScanError> {
        let resolver = IgnoreResolver::new(&self.config.root)?;
        let entries = tagger::run_tagger(&self.config.tagger_program, &self.config.root)?;
        self.build_map(&resolver, &entries)
    }

    /// Repository root the scan's ignore rules resolve against, or the
    /// scan root itself when no repository was found.
    pub fn base_dir(&self) -> Result<PathBuf, ScanError> {
        let resolver = IgnoreResolver::new(&self.config.root)?;
        Ok(resolver
            .repo_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| canonical_or(&self.config.root)))
    }

    /// Build a map from pre-parsed tagger entries.
    pub fn build_map(
        &self,
        resolver: &IgnoreResolver,
        entries: &[TagEntry],
    ) -> Result<CodeMap, ScanError> {
        let start = Instant::now();
        let scan_root = canonical_or(&self.config.root);
        let files = self.discover_files(resolver)?;

        // Entry order matters: root replacement and sibling dedup both
        // depend on it, so this pass stays sequential.
        let mut states: HashMap<PathBuf, FileState> = HashMap::new();
        for entry in entries {
            let Ok(path) = entry.path.canonicalize() else {
                continue;
            };
            if !files.contains(&path) {
                continue;
            }

            let handler = self.handler_for_language(entry.language.as_deref());
            if !handler.keep_entry(entry) {
                continue;
            }
            let Some(category) = handler.categorize(entry) else {
                continue;
            };

            let description = handler.description(entry);
            let module = handler.module_path(entry);
            let name = handler.symbol_name(entry);

            let symbol = Symbol {
                name: name.clone(),
                kind: entry.kind_tag().to_string(),
                description: description.clone(),
                line: entry.line,
                scope: entry.scope.clone(),
                signature: entry.signature.clone(),
                type_ref: entry.typeref.clone(),
                inherits_from: entry.inherits_from(),
            };

            let state = states.entry(path.clone()).or_default();
            state.tree.add_symbol(symbol, entry.scope.as_deref());

            // A module declaration already names its own section header.
            if !(category == "Modules" && name == module) {
                state.records.push(ModuleRecord {
                    module,
                    category,
                    name,
                    line: entry.line,
                    description: display_description(
                        entry.signature.as_deref(),
                        &description,
                    ),
                });
            }
        }

        let total_symbols: usize = states.values().map(|state| state.tree.len()).sum();

        // Per-file assembly is independent; run it on the pool.
        let ordered: Vec<&PathBuf> = files.iter().collect();
        let file_maps: Vec<FileMap> = if self.config.threads == 1 {
            ordered
                .iter()
                .map(|path| self.build_file_map(path, &scan_root, states.get(*path)))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| ScanError::ThreadPoolError(e.to_string()))?;
            pool.install(|| {
                ordered
                    .par_iter()
                    .map(|path| self.build_file_map(path, &scan_root, states.get(*path)))
                    .collect()
            })
        };

        let files_with_symbols = file_maps
            .iter()
            .filter(|file| {
                !(file.headings.is_empty() && file.modules.is_empty() && file.sections.is_empty())
            })
            .count();

        let stats = MapStats {
            total_files: file_maps.len(),
            files_with_symbols,
            total_symbols,
        };
        let metadata = MapMetadata {
            scan_duration_ms: start.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(CodeMap {
            root: scan_root,
            files: file_maps,
            stats,
            metadata,
        })
    }

    /// List files under the scan root with their inclusion status. With
    /// `all` set, excluded and hidden files are listed too.
    pub fn list_files(&self, all: bool) -> Result<Vec<FileStatus>, ScanError> {
        let resolver = IgnoreResolver::new(&self.config.root)?;
        let included = self.discover_files(&resolver)?;
        let base = resolver
            .repo_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| canonical_or(&self.config.root));

        let mut statuses = Vec::new();
        if all {
            for entry in WalkDir::new(&self.config.root)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(path) = entry.path().canonicalize() else {
                    continue;
                };
                statuses.push(FileStatus {
                    display: path.strip_prefix(&base).ok().map(Path::to_path_buf),
                    included: included.contains(&path),
                    path,
                });
            }
        } else {
            for path in included {
                statuses.push(FileStatus {
                    display: path.strip_prefix(&base).ok().map(Path::to_path_buf),
                    included: true,
                    path,
                });
            }
        }
        Ok(statuses)
    }

    /// Walk the scan root and return the canonical paths of every file
    /// that belongs on the map.
    fn discover_files(&self, resolver: &IgnoreResolver) -> Result<BTreeSet<PathBuf>, ScanError> {
        let output_name: Option<OsString> = self
            .config
            .output_path
            .as_ref()
            .and_then(|p| p.file_name().map(OsString::from));
        let output_canonical: Option<PathBuf> = self
            .config
            .output_path
            .as_ref()
            .and_then(|p| p.canonicalize().ok());

        let mut files = BTreeSet::new();
        let walker = WalkDir::new(&self.config.root)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(path) = entry.path().canonicalize() else {
                continue;
            };

            // The map itself (under any directory) never goes on the map.
            if output_name.as_deref() == Some(entry.file_name()) {
                continue;
            }
            if output_canonical.as_deref() == Some(path.as_path()) {
                continue;
            }

            // Files outside the repository root have no rules to apply.
            if let Some(root) = resolver.repo_root() {
                if let Ok(rel) = path.strip_prefix(root) {
                    if resolver.is_ignored(rel) {
                        continue;
                    }
                }
            }

            if self.chain_decision(&path) == ProcessDecision::Process {
                files.insert(path);
            }
        }
        Ok(files)
    }

    /// Run the handler chain for a path; the generic handler decides when
    /// no language-specific handler claims it.
    fn chain_decision(&self, path: &Path) -> ProcessDecision {
        for (_, handler) in &self.handlers {
            match handler.should_process(path) {
                ProcessDecision::Unhandled => continue,
                decision => return decision,
            }
        }
        self.generic.should_process(path)
    }

    /// First language-specific handler that processes this path, if any.
    fn owning_handler(&self, path: &Path) -> Option<&dyn LanguageHandler> {
        self.handlers.iter().find_map(|(_, handler)| {
            if handler.should_process(path) == ProcessDecision::Process {
                Some(handler.as_ref())
            } else {
                None
            }
        })
    }

    fn handler_for_language(&self, language: Option<&str>) -> &dyn LanguageHandler {
        language
            .and_then(|lang| self.handlers.iter().find(|(name, _)| *name == lang))
            .map(|(_, handler)| handler.as_ref())
            .unwrap_or(&self.generic)
    }

    /// Assemble the map entry for one file.
    fn build_file_map(
        &self,
        path: &Path,
        scan_root: &Path,
        state: Option<&FileState>,
    ) -> FileMap {
        let display = path
            .strip_prefix(scan_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf());
        let source = fs::read_to_string(path).ok();
        let line_count = source.as_deref().map(|s| s.lines().count());

        let mut headings = Vec::new();
        let mut modules = Vec::new();
        let mut sections = Vec::new();

        if path.extension().and_then(|ext| ext.to_str()) == Some("md") {
            if let Some(source) = &source {
                headings = MarkdownHandler::extract_headings(source);
            }
        } else if let Some(state) = state {
            if self.owning_handler(path).is_some() {
                modules = module_sections(&state.records);
            } else {
                sections = tree_sections(&state.tree, self.config.debug);
            }
        }

        FileMap {
            path: display,
            line_count,
            headings,
            modules,
            sections,
        }
    }
}

fn canonical_or(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Display description: the raw signature when present, otherwise the
/// handler's description trimmed.
fn display_description(signature: Option<&str>, description: &str) -> String {
    match signature {
        Some(signature) if !signature.is_empty() => signature.to_string(),
        _ => description.trim().to_string(),
    }
}

/// Group flat records into module sections, modules and categories in
/// name order, symbols in line order.
fn module_sections(records: &[ModuleRecord]) -> Vec<ModuleSection> {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<&ModuleRecord>>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(&record.module)
            .or_default()
            .entry(&record.category)
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .map(|(module, categories)| ModuleSection {
            name: module.to_string(),
            sections: categories
                .into_iter()
                .map(|(category, mut records)| {
                    records.sort_by_key(|r| r.line);
                    MapSection {
                        category: category.to_string(),
                        symbols: records
                            .into_iter()
                            .map(|r| MapNode {
                                name: r.name.clone(),
                                line: r.line,
                                category: category.to_string(),
                                description: r.description.clone(),
                                inherits_from: Vec::new(),
                                children: Vec::new(),
                            })
                            .collect(),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Render a symbol tree into category sections: root symbols grouped by
/// category, `Unknown` and `File` suppressed outside debug mode.
fn tree_sections(tree: &SymbolTree, debug: bool) -> Vec<MapSection> {
    let mut roots: Vec<SymbolId> = tree.roots().collect();
    sort_by_category_then_line(tree, &mut roots);

    let mut by_category: BTreeMap<String, Vec<SymbolId>> = BTreeMap::new();
    for id in roots {
        by_category
            .entry(node_category(tree, id))
            .or_default()
            .push(id);
    }

    by_category
        .into_iter()
        .filter(|(category, _)| debug || (category != "Unknown" && category != "File"))
        .map(|(category, ids)| MapSection {
            symbols: ids.iter().map(|&id| node_view(tree, id)).collect(),
            category,
        })
        .collect()
}

fn node_category(tree: &SymbolTree, id: SymbolId) -> String {
    let symbol = tree.symbol(id);
    classify(&symbol.kind, tree.parent(id).is_some(), &symbol.name)
        .label()
        .to_string()
}

fn sort_by_category_then_line(tree: &SymbolTree, ids: &mut [SymbolId]) {
    ids.sort_by(|&a, &b| {
        let key_a = (node_category(tree, a), tree.symbol(a).line);
        let key_b = (node_category(tree, b), tree.symbol(b).line);
        key_a.cmp(&key_b)
    });
}

/// Build the display node for one symbol: children sorted, deduplicated
/// on (name, kind, signature), and grouped by category.
fn node_view(tree: &SymbolTree, id: SymbolId) -> MapNode {
    let symbol = tree.symbol(id);
    let description = display_description(symbol.signature.as_deref(), &symbol.description);

    let mut children: Vec<SymbolId> = tree.children(id).to_vec();
    sort_by_category_then_line(tree, &mut children);

    let mut seen: HashSet<(String, String, Option<String>)> = HashSet::new();
    let mut grouped: BTreeMap<String, Vec<SymbolId>> = BTreeMap::new();
    for &child in &children {
        let child_symbol = tree.symbol(child);
        let key = (
            child_symbol.name.clone(),
            child_symbol.kind.clone(),
            child_symbol.signature.clone(),
        );
        if !seen.insert(key) {
            continue;
        }
        grouped
            .entry(node_category(tree, child))
            .or_default()
            .push(child);
    }

    let child_sections = grouped
        .into_iter()
        .map(|(category, mut ids)| {
            ids.sort_by_key(|&id| tree.symbol(id).line);
            MapSection {
                symbols: ids.iter().map(|&id| node_view(tree, id)).collect(),
                category,
            }
        })
        .collect();

    MapNode {
        name: symbol.name.clone(),
        line: symbol.line,
        category: node_category(tree, id),
        description,
        inherits_from: symbol.inherits_from.clone(),
        children: child_sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(path: &Path, name: &str, kind: &str, line: usize) -> TagEntry {
        TagEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            kind: Some(kind.to_string()),
            line,
            pattern: Some(format!("/^{name}$/")),
            ..Default::default()
        }
    }

    fn scanner(root: &Path) -> MapScanner {
        MapScanner::new(
            MapConfig::new(root.to_path_buf())
                .with_threads(1)
                .with_output_path(None),
        )
    }

    fn empty_resolver() -> IgnoreResolver {
        IgnoreResolver::from_corpus(&crate::ignore::RuleCorpus::new()).unwrap()
    }

    #[test]
    fn test_build_map_groups_roots_by_category() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app.py");
        fs::write(&app, "class Config:\n    def load(self):\n        pass\n").unwrap();

        let mut method = entry(&app, "load", "member", 2);
        method.scope = Some("Config".to_string());

        let entries = vec![
            entry(&app, "Config", "class", 1),
            method,
            entry(&app, "main", "function", 5),
        ];

        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &entries)
            .unwrap();

        assert_eq!(map.files.len(), 1);
        let file = &map.files[0];
        assert_eq!(file.path, PathBuf::from("app.py"));
        assert_eq!(file.line_count, Some(3));

        let categories: Vec<&str> = file.sections.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["Classes", "Functions"]);

        let config = &file.sections[0].symbols[0];
        assert_eq!(config.name, "Config");
        assert_eq!(config.children.len(), 1);
        // Python methods come back from the tagger as kind "member",
        // which classifies under the title-cased fallback.
        assert_eq!(config.children[0].category, "Member");
        assert_eq!(config.children[0].symbols[0].name, "load");
    }

    #[test]
    fn test_build_map_markdown_headings() {
        let dir = TempDir::new().unwrap();
        let readme = dir.path().join("README.md");
        fs::write(&readme, "# Intro\n\n## Usage\n").unwrap();

        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &[])
            .unwrap();

        let file = &map.files[0];
        assert_eq!(file.headings.len(), 2);
        assert_eq!(file.headings[0].text, "Intro");
        assert_eq!(file.headings[1].level, 2);
    }

    #[test]
    fn test_ignored_file_left_off_the_map() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "skip.py\n").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("skip.py"), "y = 2\n").unwrap();

        let resolver = IgnoreResolver::new(dir.path()).unwrap();
        let map = scanner(dir.path()).build_map(&resolver, &[]).unwrap();

        let paths: Vec<&PathBuf> = map.files.iter().map(|f| &f.path).collect();
        assert_eq!(paths, vec![&PathBuf::from("app.py")]);
    }

    #[test]
    fn test_output_file_excluded_by_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("MAP.txt"), "old map\n").unwrap();

        let config = MapConfig::new(dir.path().to_path_buf())
            .with_threads(1)
            .with_output_path(Some(PathBuf::from("MAP.txt")));
        let map = MapScanner::new(config)
            .build_map(&empty_resolver(), &[])
            .unwrap();

        assert_eq!(map.files.len(), 1);
        assert_eq!(map.files[0].path, PathBuf::from("app.py"));
    }

    #[test]
    fn test_module_sections_for_language_handler() {
        let dir = TempDir::new().unwrap();
        let mli = dir.path().join("parser.mli");
        fs::write(&mli, "val parse : string -> t\n").unwrap();

        let mut parse = entry(&mli, "parse", "val", 1);
        parse.language = Some("OCaml".to_string());
        parse.scope = Some("module:Parser".to_string());

        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &[parse])
            .unwrap();

        let file = &map.files[0];
        assert!(file.sections.is_empty());
        assert_eq!(file.modules.len(), 1);
        assert_eq!(file.modules[0].name, "Parser");
        assert_eq!(file.modules[0].sections[0].category, "Functions");
        assert_eq!(file.modules[0].sections[0].symbols[0].name, "parse");
    }

    #[test]
    fn test_stats_count_files_and_symbols() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app.py");
        fs::write(&app, "def main():\n    pass\n").unwrap();
        fs::write(dir.path().join("empty.py"), "").unwrap();

        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &[entry(&app, "main", "function", 1)])
            .unwrap();

        assert_eq!(map.stats.total_files, 2);
        assert_eq!(map.stats.files_with_symbols, 1);
        assert_eq!(map.stats.total_symbols, 1);
    }

    #[test]
    fn test_hidden_files_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join(".secret.py"), "y = 2\n").unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache/deep.py"), "z = 3\n").unwrap();

        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &[])
            .unwrap();

        assert_eq!(map.files.len(), 1);
        assert_eq!(map.files[0].path, PathBuf::from("app.py"));
    }

    #[test]
    fn test_list_files_marks_exclusions() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "skip.py\n").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("skip.py"), "y = 2\n").unwrap();

        let listing = scanner(dir.path()).list_files(true).unwrap();
        let skip = listing
            .iter()
            .find(|s| s.display == Some(PathBuf::from("skip.py")))
            .unwrap();
        assert!(!skip.included);
        let app = listing
            .iter()
            .find(|s| s.display == Some(PathBuf::from("app.py")))
            .unwrap();
        assert!(app.included);

        let included_only = scanner(dir.path()).list_files(false).unwrap();
        assert!(included_only.iter().all(|s| s.included));
    }

    #[test]
    fn test_duplicate_sibling_collapsed_in_view() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app.py");
        fs::write(&app, "class C:\n    def m(self):\n        pass\n").unwrap();

        let mut first = entry(&app, "m", "member", 2);
        first.scope = Some("C".to_string());
        let mut second = entry(&app, "m", "member", 2);
        second.scope = Some("C".to_string());

        let entries = vec![entry(&app, "C", "class", 1), first, second];
        let map = scanner(dir.path())
            .build_map(&empty_resolver(), &entries)
            .unwrap();

        let class_node = &map.files[0].sections[0].symbols[0];
        assert_eq!(class_node.children[0].symbols.len(), 1);
    }
}
