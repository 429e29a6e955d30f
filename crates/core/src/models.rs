//! Data models for code map generation
//!
//! Defines the tag entry record consumed from the external tagger, the
//! kind-to-category classification table, and the serializable display
//! model that the output formatters consume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One tagged symbol as emitted by the external tagger (JSON lines).
///
/// Every field except `name` and `path` is optional in practice; a missing
/// line number defaults to 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagEntry {
    pub name: String,
    pub path: PathBuf,
    pub pattern: Option<String>,
    pub kind: Option<String>,
    pub line: usize,
    pub scope: Option<String>,
    #[serde(rename = "scopeKind")]
    pub scope_kind: Option<String>,
    pub language: Option<String>,
    pub access: Option<String>,
    pub signature: Option<String>,
    pub typeref: Option<String>,
    pub roles: Option<String>,
}

impl TagEntry {
    /// Kind tag, empty when absent.
    pub fn kind_tag(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    /// Supertype names declared via a `kind:SuperType` type reference.
    /// At most one per symbol; cross-file resolution is out of scope.
    pub fn inherits_from(&self) -> Vec<String> {
        match &self.typeref {
            Some(typeref) if typeref.contains(':') => typeref
                .rsplit(':')
                .next()
                .map(|name| vec![name.to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Display category for a symbol, derived from its kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Classes,
    Methods,
    Functions,
    ClassVariables,
    Constants,
    Variables,
    Modules,
    /// Unrecognized kinds surface as the kind itself, title-cased
    Other(String),
}

impl Category {
    pub fn label(&self) -> &str {
        match self {
            Category::Classes => "Classes",
            Category::Methods => "Methods",
            Category::Functions => "Functions",
            Category::ClassVariables => "Class Variables",
            Category::Constants => "Constants",
            Category::Variables => "Variables",
            Category::Modules => "Modules",
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a kind tag to a display category.
///
/// Total function: unknown kinds fall back to the title-cased kind itself,
/// and nothing here can fail.
pub fn classify(kind: &str, has_parent: bool, name: &str) -> Category {
    match kind {
        "class" | "struct" | "interface" | "c" => Category::Classes,
        "function" | "f" => {
            if has_parent {
                Category::Methods
            } else {
                Category::Functions
            }
        }
        "variable" | "field" | "v" => {
            if has_parent {
                Category::ClassVariables
            } else if is_upper_name(name) {
                Category::Constants
            } else {
                Category::Variables
            }
        }
        "namespace" | "package" | "module" | "i" => Category::Modules,
        other => Category::Other(title_case(other)),
    }
}

/// True for names written entirely in upper case (at least one cased
/// character, none of them lower case).
fn is_upper_name(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}

/// Title-case a kind tag: first letter of each word upper, rest lower.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Rendered view of one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct MapNode {
    /// Symbol name, possibly qualified
    pub name: String,

    /// Source line (1-indexed)
    pub line: usize,

    /// Category label the symbol was grouped under
    pub category: String,

    /// Raw description (signature when available, else the tag pattern)
    pub description: String,

    /// Declared supertype names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits_from: Vec<String>,

    /// Child symbols grouped by category
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MapSection>,
}

impl MapNode {
    /// Name with any qualifying prefix stripped, for display.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A category heading and the symbols grouped under it.
#[derive(Debug, Clone, Serialize)]
pub struct MapSection {
    pub category: String,
    pub symbols: Vec<MapNode>,
}

/// One Markdown header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub line: usize,
    pub level: usize,
    pub text: String,
}

/// Flat module grouping used for files owned by a language-specific
/// handler. An empty module name means top-level symbols.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSection {
    pub name: String,
    pub sections: Vec<MapSection>,
}

/// Complete map entry for a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMap {
    /// Path relative to the scanned directory (absolute if outside it)
    pub path: PathBuf,

    /// Line count, when the file could be read
    pub line_count: Option<usize>,

    /// Markdown headers (Markdown files only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<Heading>,

    /// Module-grouped sections (files owned by a language handler)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSection>,

    /// Category-grouped symbol trees (everything else)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<MapSection>,
}

/// Summary statistics for a mapping run.
#[derive(Debug, Clone, Serialize)]
pub struct MapStats {
    pub total_files: usize,
    pub files_with_symbols: usize,
    pub total_symbols: usize,
}

/// Metadata about the mapping run.
#[derive(Debug, Clone, Serialize)]
pub struct MapMetadata {
    pub scan_duration_ms: u64,
    pub timestamp: String,
    pub tool_version: String,
}

/// The complete generated map.
#[derive(Debug, Clone, Serialize)]
pub struct CodeMap {
    pub root: PathBuf,
    pub files: Vec<FileMap>,
    pub stats: MapStats,
    pub metadata: MapMetadata,
}
