//! Classic text map formatter

use crate::models::{CodeMap, MapNode};
use crate::output::FormatError;
use regex::Regex;

const HEADER: &str = "# This file was automatically generated. Do not edit manually.\n\
                      #\n\
                      # Each section describes a file and each line begins with (line_number).\n";

/// Format a map as the classic indented text listing
pub fn format_text(data: &CodeMap) -> Result<String, FormatError> {
    let cleaner = Cleaner::new()?;
    let mut out = String::new();
    out.push_str(HEADER);

    for file in &data.files {
        out.push_str(&format!("\n{}:\n", file.path.display()));
        if let Some(lines) = file.line_count {
            out.push_str(&format!("  Size: {} lines\n", lines));
        }

        for heading in &file.headings {
            out.push_str(&format!(
                "{}({}) {}\n",
                "  ".repeat(heading.level),
                heading.line,
                heading.text
            ));
        }

        for module in &file.modules {
            let indent = if module.name.is_empty() {
                "  "
            } else {
                out.push_str(&format!("  Module {}:\n", module.name));
                "    "
            };
            for section in &module.sections {
                if section.symbols.is_empty() {
                    continue;
                }
                out.push_str(&format!("{indent}{}:\n", section.category));
                for node in &section.symbols {
                    out.push_str(&format!(
                        "{indent}  ({}) {}: {}\n",
                        node.line, node.name, node.description
                    ));
                }
            }
        }

        for section in &file.sections {
            out.push_str(&format!("  {}:\n", section.category));
            for node in &section.symbols {
                write_node(&mut out, node, 2, &cleaner);
            }
        }
    }

    Ok(out)
}

fn write_node(out: &mut String, node: &MapNode, indent_level: usize, cleaner: &Cleaner) {
    let indent = "  ".repeat(indent_level);

    let mut desc = cleaner.clean(&node.description);
    if !node.inherits_from.is_empty() {
        desc = format!("{} inherits from {}", desc, node.inherits_from.join(", "));
    }
    // Drop the name from the description when it just repeats it.
    if let Some(rest) = desc.strip_prefix(&format!("{}:", node.name)) {
        desc = rest.trim().to_string();
    }

    out.push_str(&format!(
        "{indent}({}) {}: {}\n",
        node.line,
        node.simple_name(),
        desc
    ));

    for section in &node.children {
        if section.symbols.is_empty() {
            continue;
        }
        out.push_str(&format!("{indent}  {}:\n", section.category));
        for child in &section.symbols {
            write_node(out, child, indent_level + 2, cleaner);
        }
    }
}

/// Description cleanup: trailing comments removed, Python type hints
/// rewritten into a compact form.
struct Cleaner {
    trailing_comment: Regex,
    inherits_note: Regex,
    optional_hint: Regex,
    list_hint: Regex,
    dict_hint: Regex,
}

impl Cleaner {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            trailing_comment: Regex::new(r"\s*[#/].*$")?,
            inherits_note: Regex::new(r"\(inherits from: .*?\)")?,
            optional_hint: Regex::new(r": Optional\[(.*?)\]")?,
            list_hint: Regex::new(r": List\[(.*?)\]")?,
            dict_hint: Regex::new(r": Dict\[(.*?),(.*?)\]")?,
        })
    }

    fn clean(&self, description: &str) -> String {
        let desc = description.trim_end();
        let desc = self.trailing_comment.replace(desc, "");
        let desc = self.inherits_note.replace_all(&desc, "");
        let desc = self.optional_hint.replace_all(&desc, "?: $1");
        let desc = self.list_hint.replace_all(&desc, ": $1[]");
        let desc = self.dict_hint.replace_all(&desc, ": {$1: $2}");
        desc.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileMap, Heading, MapMetadata, MapSection, MapStats, ModuleSection};
    use std::path::PathBuf;

    fn map_with(files: Vec<FileMap>) -> CodeMap {
        let files_with_symbols = files.len();
        CodeMap {
            root: PathBuf::from("/repo"),
            files,
            stats: MapStats {
                total_files: files_with_symbols,
                files_with_symbols,
                total_symbols: 0,
            },
            metadata: MapMetadata {
                scan_duration_ms: 1,
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                tool_version: "0.1.0".to_string(),
            },
        }
    }

    fn node(name: &str, line: usize, category: &str, description: &str) -> MapNode {
        MapNode {
            name: name.to_string(),
            line,
            category: category.to_string(),
            description: description.to_string(),
            inherits_from: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_header_and_file_block() {
        let map = map_with(vec![FileMap {
            path: PathBuf::from("src/app.py"),
            line_count: Some(12),
            headings: vec![],
            modules: vec![],
            sections: vec![MapSection {
                category: "Functions".to_string(),
                symbols: vec![node("main", 3, "Functions", "def main():")],
            }],
        }]);

        let text = format_text(&map).unwrap();
        assert!(text.starts_with("# This file was automatically generated."));
        assert!(text.contains("\nsrc/app.py:\n"));
        assert!(text.contains("  Size: 12 lines\n"));
        assert!(text.contains("  Functions:\n    (3) main: def main():\n"));
    }

    #[test]
    fn test_nested_children_indentation() {
        let mut class_node = node("Config", 1, "Classes", "class Config:");
        class_node.children = vec![MapSection {
            category: "Functions".to_string(),
            symbols: vec![node("Config.load", 2, "Functions", "(self, path)")],
        }];

        let map = map_with(vec![FileMap {
            path: PathBuf::from("app.py"),
            line_count: Some(5),
            headings: vec![],
            modules: vec![],
            sections: vec![MapSection {
                category: "Classes".to_string(),
                symbols: vec![class_node],
            }],
        }]);

        let text = format_text(&map).unwrap();
        assert!(text.contains("    (1) Config: class Config:\n"));
        assert!(text.contains("      Functions:\n"));
        assert!(text.contains("        (2) load: (self, path)\n"));
    }

    #[test]
    fn test_type_hint_rewrites() {
        let cleaner = Cleaner::new().unwrap();
        assert_eq!(cleaner.clean("x: Optional[int]"), "x?: int");
        assert_eq!(cleaner.clean("xs: List[str]"), "xs: str[]");
        assert_eq!(cleaner.clean("m: Dict[str, int]"), "m: {str:  int}");
        assert_eq!(cleaner.clean("value = 1  # note"), "value = 1");
    }

    #[test]
    fn test_inheritance_appended() {
        let mut base = node("Child", 4, "Classes", "class Child(Base):");
        base.inherits_from = vec!["Base".to_string()];

        let map = map_with(vec![FileMap {
            path: PathBuf::from("app.py"),
            line_count: None,
            headings: vec![],
            modules: vec![],
            sections: vec![MapSection {
                category: "Classes".to_string(),
                symbols: vec![base],
            }],
        }]);

        let text = format_text(&map).unwrap();
        assert!(text.contains("(4) Child: class Child(Base): inherits from Base\n"));
    }

    #[test]
    fn test_markdown_headings() {
        let map = map_with(vec![FileMap {
            path: PathBuf::from("README.md"),
            line_count: Some(9),
            headings: vec![
                Heading { line: 1, level: 1, text: "Intro".to_string() },
                Heading { line: 5, level: 2, text: "Usage".to_string() },
            ],
            modules: vec![],
            sections: vec![],
        }]);

        let text = format_text(&map).unwrap();
        assert!(text.contains("  (1) Intro\n"));
        assert!(text.contains("    (5) Usage\n"));
    }

    #[test]
    fn test_module_sections() {
        let map = map_with(vec![FileMap {
            path: PathBuf::from("parser.mli"),
            line_count: Some(20),
            headings: vec![],
            modules: vec![ModuleSection {
                name: "Parser".to_string(),
                sections: vec![MapSection {
                    category: "Functions".to_string(),
                    symbols: vec![node("parse", 2, "Functions", "string -> t")],
                }],
            }],
            sections: vec![],
        }]);

        let text = format_text(&map).unwrap();
        assert!(text.contains("  Module Parser:\n"));
        assert!(text.contains("    Functions:\n      (2) parse: string -> t\n"));
    }
}
