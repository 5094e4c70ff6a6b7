//! Built-in type oracles.
//!
//! Small, dependency-free oracles good enough to drive the type-grouping
//! strategies: a magic-byte content sniffer and an extension-based language
//! guesser. Both satisfy [`TypeOracle`], so callers can swap in anything
//! smarter without touching the grouper.

use crate::order::TypeOracle;
use std::path::Path;

/// Magic-byte prefixes checked by the sniffer, most specific first.
const MAGIC: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "png"),
    (b"SQLite format 3\0", "sqlite"),
    (b"%PDF", "pdf"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"\xff\xd8\xff", "jpeg"),
    (b"PK\x03\x04", "zip"),
    (b"\x7fELF", "elf"),
    (b"\x1f\x8b", "gzip"),
    (b"BZh", "bzip2"),
    (b"\x28\xb5\x2f\xfd", "zstd"),
    (b"\xfd7zXZ\x00", "xz"),
    (b"\0asm", "wasm"),
    (b"%!PS", "postscript"),
    (b"MZ", "pe"),
];

/// Content-based oracle: magic bytes for known binary formats, a text
/// heuristic otherwise.
pub struct ContentSniffer;

impl ContentSniffer {
    fn looks_textual(head: &[u8]) -> bool {
        if head.is_empty() {
            return true;
        }
        if head.contains(&0) {
            return false;
        }
        let printable = head
            .iter()
            .filter(|&&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b) || b >= 0x80)
            .count();
        printable * 100 / head.len() >= 90
    }
}

impl TypeOracle for ContentSniffer {
    fn label(&self, _path: &Path, head: &[u8]) -> String {
        for &(magic, label) in MAGIC {
            if head.starts_with(magic) {
                return label.to_string();
            }
        }
        if Self::looks_textual(head) {
            "text".to_string()
        } else {
            "binary".to_string()
        }
    }
}

/// Path-based oracle mapping filename extensions to coarse language labels.
/// Unknown extensions label as themselves; extensionless files as `noext`.
pub struct ExtensionLangOracle;

impl TypeOracle for ExtensionLangOracle {
    fn label(&self, path: &Path, _head: &[u8]) -> String {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return "noext".to_string();
        };
        let ext = ext.to_ascii_lowercase();
        let label = match ext.as_str() {
            "rs" => "rust",
            "c" | "h" => "c",
            "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
            "py" => "python",
            "js" | "mjs" => "javascript",
            "ts" | "tsx" => "typescript",
            "java" => "java",
            "go" => "go",
            "rb" => "ruby",
            "php" => "php",
            "sh" | "bash" => "shell",
            "md" | "markdown" => "markdown",
            "json" => "json",
            "yml" | "yaml" => "yaml",
            "toml" => "toml",
            "xml" => "xml",
            "html" | "htm" => "html",
            "css" => "css",
            "txt" => "plain",
            _ => return ext,
        };
        label.to_string()
    }
}
