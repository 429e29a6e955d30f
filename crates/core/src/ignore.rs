//! Ignore rule handling
//!
//! This module collects exclude rules from `.gitignore` and `.mapignore`
//! files scattered across a repository, compiles them into path-matching
//! regexes, and resolves a single include/exclude verdict per path.
//!
//! Rules are applied in a fixed precedence order: origin directories sorted
//! by decreasing depth, the `.gitignore` family before the `.mapignore`
//! family within a directory, and file order within a family. Every rule
//! that matches overwrites the running verdict, so the last match in that
//! ordering wins. Deeper directories are listed first, which means a rule
//! from a shallower directory overrides a deeper one when both match.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Ignore engine errors
#[derive(Error, Debug)]
pub enum IgnoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// The two rule families layered together during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    /// Rules from `.gitignore` files
    Git,
    /// Rules from `.mapignore` files
    Map,
}

impl RuleFamily {
    /// Families in their fixed layering order.
    pub const ALL: [RuleFamily; 2] = [RuleFamily::Git, RuleFamily::Map];

    /// File name that rules of this family are read from.
    pub fn file_name(&self) -> &'static str {
        match self {
            RuleFamily::Git => ".gitignore",
            RuleFamily::Map => ".mapignore",
        }
    }
}

/// Rules contributed by a single directory, split by family.
#[derive(Debug, Clone, Default)]
pub struct DirRules {
    pub git: Vec<String>,
    pub map: Vec<String>,
}

impl DirRules {
    fn family(&self, family: RuleFamily) -> &[String] {
        match family {
            RuleFamily::Git => &self.git,
            RuleFamily::Map => &self.map,
        }
    }

    fn family_mut(&mut self, family: RuleFamily) -> &mut Vec<String> {
        match family {
            RuleFamily::Git => &mut self.git,
            RuleFamily::Map => &mut self.map,
        }
    }
}

/// All discovered rules, keyed by origin directory relative to the
/// repository root (`.` stands for the root itself). Built once per
/// resolution session; inserting the same (directory, family) slot again
/// replaces the previous list, so revisiting a directory is idempotent.
#[derive(Debug, Clone, Default)]
pub struct RuleCorpus {
    dirs: BTreeMap<PathBuf, DirRules>,
}

impl RuleCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rule list for one (directory, family) slot.
    pub fn insert(&mut self, dir: impl Into<PathBuf>, family: RuleFamily, rules: Vec<String>) {
        *self.dirs.entry(dir.into()).or_default().family_mut(family) = rules;
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Origin directories ordered by decreasing depth. Directories at equal
    /// depth keep their lexicographic order.
    fn ordered_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self.dirs.keys().map(PathBuf::as_path).collect();
        dirs.sort_by_key(|dir| std::cmp::Reverse(dir_depth(dir)));
        dirs
    }
}

/// Depth of an origin directory; the root marker `.` has depth zero.
fn dir_depth(dir: &Path) -> usize {
    if dir == Path::new(".") {
        0
    } else {
        dir.components().count()
    }
}

/// A single exclude rule compiled to a path-matching regex.
///
/// The matcher must only ever be asked about path fragments at or below the
/// rule's origin directory; [`IgnoreResolver::is_ignored`] enforces this.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Pattern text with negation and directory markers stripped
    pub text: String,
    /// Pattern was prefixed with `!`
    pub negated: bool,
    /// Pattern ended with `/`
    pub dir_only: bool,
    /// Directory the rule file lives in, relative to the repository root
    pub origin: PathBuf,
    /// Rule family the pattern came from
    pub family: RuleFamily,
    regex: Regex,
}

impl CompiledRule {
    /// Compile one raw rule line into a matcher.
    ///
    /// Glob syntax is never rejected: everything except the recognized
    /// wildcard tokens is escaped and matched literally. `**` matches across
    /// separators, `*` within one segment, `?` one non-separator character.
    pub fn compile(raw: &str, origin: &Path, family: RuleFamily) -> Result<Self, IgnoreError> {
        let (negated, rest) = match raw.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, raw),
        };
        let (dir_only, text) = match rest.strip_suffix('/') {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };

        // Double wildcard first so the single-wildcard substitution cannot
        // eat half of it.
        let mut body = regex::escape(text)
            .replace(r"\*\*", ".*")
            .replace(r"\*", "[^/]*")
            .replace(r"\?", "[^/]");
        if dir_only {
            body.push_str("/.*");
        }

        let pattern = if text.starts_with('/') {
            // Anchored to the origin directory, start to end.
            format!("^{}$", &body[1..])
        } else if text.contains('/') {
            // May start at any separator boundary but must reach the end.
            format!(".*/{}$", body)
        } else {
            // Separator-free: may match any single path segment.
            format!("(^|.*/?){}($|/.*)", body)
        };

        Ok(Self {
            text: text.to_string(),
            negated,
            dir_only,
            origin: origin.to_path_buf(),
            family,
            regex: Regex::new(&pattern)?,
        })
    }

    /// True if the rule matches the given path fragment. The fragment is
    /// the portion of a path below the rule's origin directory.
    pub fn matches(&self, fragment: &str) -> bool {
        self.regex.is_match(fragment)
    }
}

/// Parse the contents of a rule file into raw rule lines.
///
/// Text after a `#` is discarded, blank lines are skipped, and every
/// remaining non-empty line is one rule, in file order.
pub fn parse_rules(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Locate the repository root by walking upward from `start` until a
/// directory containing a `.git` entry is found.
///
/// `.git` may be a plain file (worktrees, submodules); its parent counts as
/// the root either way.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    let mut current = start.as_path();
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Collect rule files from every directory that can affect paths under
/// `start`: first walking up from `start` to `root`, then down through all
/// subdirectories of `start`, skipping the `.git` control directory.
pub fn collect_rules(start: &Path, root: &Path) -> Result<RuleCorpus, IgnoreError> {
    let mut corpus = RuleCorpus::new();
    let start = start.canonicalize()?;

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if !dir.starts_with(root) {
            break;
        }
        visit_dir(dir, root, &mut corpus)?;
        if dir == root {
            break;
        }
        current = dir.parent();
    }

    let walker = WalkDir::new(&start)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            visit_dir(entry.path(), root, &mut corpus)?;
        }
    }

    Ok(corpus)
}

/// Load the rule files of one directory into the corpus. Directories that
/// are not under the root contribute nothing.
fn visit_dir(dir: &Path, root: &Path, corpus: &mut RuleCorpus) -> Result<(), IgnoreError> {
    let rel = match dir.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return Ok(()),
    };
    let key = if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel.to_path_buf()
    };

    for family in RuleFamily::ALL {
        let file = dir.join(family.file_name());
        if file.is_file() {
            let rules = parse_rules(&fs::read_to_string(&file)?);
            if !rules.is_empty() {
                corpus.insert(key.clone(), family, rules);
            }
        }
    }
    Ok(())
}

/// Resolves include/exclude verdicts for paths relative to the repository
/// root.
///
/// All rules are compiled once at construction; resolution afterwards is
/// pure and deterministic. Paths that cannot be expressed relative to the
/// root have no ignore semantics and must not be asked about.
pub struct IgnoreResolver {
    root: Option<PathBuf>,
    rules: Vec<CompiledRule>,
}

impl IgnoreResolver {
    /// Discover the repository root from `start` and compile every rule
    /// found in the tree. Without a root there are no rules and every path
    /// resolves as included.
    pub fn new(start: &Path) -> Result<Self, IgnoreError> {
        let Some(root) = find_repo_root(start) else {
            return Ok(Self {
                root: None,
                rules: Vec::new(),
            });
        };
        let corpus = collect_rules(start, &root)?;
        let rules = compile_corpus(&corpus)?;
        Ok(Self {
            root: Some(root),
            rules,
        })
    }

    /// Build a resolver directly from an in-memory corpus, without touching
    /// the file system.
    pub fn from_corpus(corpus: &RuleCorpus) -> Result<Self, IgnoreError> {
        Ok(Self {
            root: None,
            rules: compile_corpus(corpus)?,
        })
    }

    /// Repository root the rules were collected under, if one was found.
    pub fn repo_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Number of compiled rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Resolve a path (relative to the repository root) to an exclusion
    /// verdict. `true` means the path is excluded.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        let mut ignored = false;

        for rule in &self.rules {
            let fragment = if rule.origin == Path::new(".") {
                path_str.as_ref()
            } else {
                // Only rules from ancestor directories of the path apply;
                // the fragment keeps its leading separator.
                let origin = rule.origin.to_string_lossy();
                let Some(rest) = path_str.strip_prefix(origin.as_ref()) else {
                    continue;
                };
                if !rest.starts_with('/') {
                    continue;
                }
                rest
            };

            if rule.matches(fragment) {
                ignored = !rule.negated;
            }
        }

        ignored
    }
}

/// Compile a corpus into the precedence-ordered rule list: deepest origin
/// directories first, `.gitignore` before `.mapignore` within a directory,
/// file order within a family.
fn compile_corpus(corpus: &RuleCorpus) -> Result<Vec<CompiledRule>, IgnoreError> {
    let mut rules = Vec::new();
    for dir in corpus.ordered_dirs() {
        let dir_rules = &corpus.dirs[dir];
        for family in RuleFamily::ALL {
            for raw in dir_rules.family(family) {
                rules.push(CompiledRule::compile(raw, dir, family)?);
            }
        }
    }
    Ok(rules)
}
