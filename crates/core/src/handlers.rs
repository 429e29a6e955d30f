//! Language handlers
//!
//! A handler decides whether a file belongs on the map, filters and
//! categorizes its tag entries, and shapes symbol descriptions. Handlers
//! for specific languages are consulted in a fixed chain; the generic
//! handler is the fallback for everything the tagger understands.

use crate::models::{title_case, Heading, TagEntry};
use std::path::Path;

/// Decision on whether a file should be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDecision {
    /// Handler will process this file
    Process,
    /// Handler is responsible for this file type but declines; the chain
    /// stops here and the file is left off the map
    Skip,
    /// Handler doesn't handle this type of file
    Unhandled,
}

/// Per-language symbol handling.
pub trait LanguageHandler: Send + Sync {
    /// Decide whether this handler processes the given file.
    fn should_process(&self, path: &Path) -> ProcessDecision;

    /// Categorize a tag entry into a section heading. `None` drops the
    /// entry entirely.
    fn categorize(&self, entry: &TagEntry) -> Option<String>;

    /// Filter out unwanted entries before categorization.
    fn keep_entry(&self, _entry: &TagEntry) -> bool {
        true
    }

    /// Formatted description: signature when present, otherwise the tag
    /// pattern with its regex markers stripped.
    fn description(&self, entry: &TagEntry) -> String {
        match entry.signature.as_deref() {
            Some(signature) if !signature.is_empty() => signature.to_string(),
            _ => strip_pattern_markers(entry.pattern.as_deref().unwrap_or("")).to_string(),
        }
    }

    /// Module path the symbol belongs to, empty for none.
    fn module_path(&self, _entry: &TagEntry) -> String {
        String::new()
    }

    /// Symbol name, possibly qualified.
    fn symbol_name(&self, entry: &TagEntry) -> String {
        entry.name.clone()
    }
}

/// Strip the `/^...$/` markers a tagger pattern is wrapped in.
pub fn strip_pattern_markers(pattern: &str) -> &str {
    pattern.trim_matches(|c| matches!(c, '/' | '^' | '$'))
}

/// Handlers for languages with bespoke treatment, keyed by the tagger's
/// language name, in chain order.
pub fn builtin_handlers() -> Vec<(&'static str, Box<dyn LanguageHandler>)> {
    vec![
        ("OCaml", Box::new(OCamlHandler)),
        ("Sh", Box::new(ShellHandler)),
        ("Markdown", Box::new(MarkdownHandler)),
    ]
}

/// Fallback handler for any language the tagger supports.
pub struct GenericHandler {
    debug: bool,
}

impl GenericHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl LanguageHandler for GenericHandler {
    fn should_process(&self, path: &Path) -> ProcessDecision {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Files with extensions, plus extensionless shell scripts.
        if path.extension().is_some() || name.ends_with("sh") || name.ends_with("bash") {
            ProcessDecision::Process
        } else {
            ProcessDecision::Unhandled
        }
    }

    fn categorize(&self, entry: &TagEntry) -> Option<String> {
        let kind = entry.kind_tag();

        // Imports and unknown symbols only surface in debug mode.
        if matches!(kind, "I" | "x" | "unknown" | "module")
            || entry.roles.as_deref() == Some("imported")
        {
            return self.debug.then(|| "Unknown".to_string());
        }

        match kind {
            "class" | "struct" | "interface" | "c" => Some("Types".to_string()),
            "namespace" | "package" | "i" => Some("Modules".to_string()),
            "function" | "method" | "member" | "f" | "m" => Some("Functions".to_string()),
            "variable" | "field" | "v" => Some("Variables".to_string()),
            "" => None,
            other => self.debug.then(|| title_case(other)),
        }
    }

    fn keep_entry(&self, entry: &TagEntry) -> bool {
        if matches!(entry.access.as_deref(), Some("private") | Some("protected")) {
            return false;
        }
        // Closing braces and similar noise.
        let pattern = entry.pattern.as_deref().unwrap_or("");
        !strip_pattern_markers(pattern).ends_with('{')
    }
}

/// Handler for Markdown files; bypasses the tagger and reads headers
/// directly.
pub struct MarkdownHandler;

impl MarkdownHandler {
    /// Extract headers of level 1-3 as (line, level, text), in file order.
    pub fn extract_headings(source: &str) -> Vec<Heading> {
        let mut headings = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if !line.starts_with('#') {
                continue;
            }
            let level = line.chars().take_while(|&c| c == '#').count();
            if level > 3 {
                continue;
            }
            let rest = &line[level..];
            let text = rest.trim_start();
            // A header needs whitespace after the markers and some text.
            if text.len() == rest.len() || text.is_empty() {
                continue;
            }
            headings.push(Heading {
                line: index + 1,
                level,
                text: text.to_string(),
            });
        }
        headings
    }
}

impl LanguageHandler for MarkdownHandler {
    fn should_process(&self, path: &Path) -> ProcessDecision {
        if path.extension().and_then(|ext| ext.to_str()) == Some("md") {
            ProcessDecision::Process
        } else {
            ProcessDecision::Unhandled
        }
    }

    fn categorize(&self, _entry: &TagEntry) -> Option<String> {
        // Headers are extracted directly; tagger entries are not used.
        None
    }
}

/// Handler for shell scripts.
pub struct ShellHandler;

impl LanguageHandler for ShellHandler {
    fn should_process(&self, path: &Path) -> ProcessDecision {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if matches!(ext, "sh" | "bash")
            || (ext.is_empty() && (name.ends_with("sh") || name.ends_with("bash")))
        {
            ProcessDecision::Process
        } else {
            ProcessDecision::Unhandled
        }
    }

    fn categorize(&self, entry: &TagEntry) -> Option<String> {
        if entry.kind_tag() != "function" {
            return None;
        }
        // Only actual function definitions, not variable assignments.
        let pattern = entry.pattern.as_deref().unwrap_or("");
        (pattern.contains("function ") || pattern.ends_with("() {"))
            .then(|| "Functions".to_string())
    }
}

/// Handler for OCaml sources.
pub struct OCamlHandler;

impl OCamlHandler {
    /// Module path as a list of module names, read from the entry's scope.
    fn module_parts(&self, entry: &TagEntry) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        let scope = entry.scope.as_deref().unwrap_or("");
        let scope_kind = entry.scope_kind.as_deref().unwrap_or("");

        if !scope.is_empty() {
            if let Some(rest) = scope.strip_prefix("module:") {
                parts = rest.split('.').map(String::from).collect();
            } else if scope_kind == "module" {
                parts = scope.split('.').map(String::from).collect();
            } else if scope.contains('/') {
                // Type-scoped items use / as separator; the last component
                // is the type name itself.
                let components: Vec<&str> = scope.split('/').collect();
                for component in &components[..components.len() - 1] {
                    if component.contains('.') {
                        parts.extend(component.split('.').map(String::from));
                    } else {
                        parts.push((*component).to_string());
                    }
                }
            } else {
                let components: Vec<&str> = scope.split('.').collect();
                if components.len() > 1 {
                    parts = components[..components.len() - 1]
                        .iter()
                        .map(|s| s.to_string())
                        .collect();
                }
            }
        }

        if entry.kind_tag() == "module" {
            parts.push(entry.name.clone());
        }
        parts
    }

    fn full_name(&self, entry: &TagEntry) -> String {
        let parts = self.module_parts(entry);
        if parts.is_empty() {
            entry.name.clone()
        } else {
            format!("{}.{}", parts.join("."), entry.name)
        }
    }
}

impl LanguageHandler for OCamlHandler {
    fn should_process(&self, path: &Path) -> ProcessDecision {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("mli") => ProcessDecision::Process,
            // Skip .ml files shadowed by an interface file.
            Some("ml") => {
                if path.with_extension("mli").exists() {
                    ProcessDecision::Skip
                } else {
                    ProcessDecision::Process
                }
            }
            _ => ProcessDecision::Unhandled,
        }
    }

    fn categorize(&self, entry: &TagEntry) -> Option<String> {
        match entry.kind_tag() {
            "function" | "val" => {
                let name = self.full_name(entry);
                let last = name.rsplit('.').next().unwrap_or("");
                if !last.is_empty() && last.chars().all(|c| "!@#$%^&*+-=<>/?|~".contains(c)) {
                    Some("Operators".to_string())
                } else {
                    Some("Functions".to_string())
                }
            }
            "type" => Some("Types".to_string()),
            "exception" => Some("Exceptions".to_string()),
            "module" => Some("Modules".to_string()),
            _ => None,
        }
    }

    fn keep_entry(&self, entry: &TagEntry) -> bool {
        // Skip docstrings and record-literal noise.
        let pattern = strip_pattern_markers(entry.pattern.as_deref().unwrap_or(""));
        !(pattern.starts_with("(**") || pattern.ends_with('{'))
    }

    fn description(&self, entry: &TagEntry) -> String {
        match entry.signature.as_deref() {
            Some(signature) if !signature.is_empty() => signature.replace("let ", ""),
            _ => strip_pattern_markers(entry.pattern.as_deref().unwrap_or("")).to_string(),
        }
    }

    fn module_path(&self, entry: &TagEntry) -> String {
        self.module_parts(entry).join(".")
    }
}
