use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::core::filenames::is_valid_filename;

pub const DEFAULT_MAX_FILE_CHARS: usize = 100_000;

/// The contents of one reviewed file, ready to be fenced into a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlock {
    pub path: String,
    pub content: String,
}

impl FileBlock {
    pub fn render(&self) -> String {
        format!("\n{}\n```\n{}\n```\n", self.path, self.content)
    }
}

/// Reads validated files relative to a root directory and renders them as
/// fenced blocks. Files that cannot be read are skipped with a warning.
pub struct FileContentFormatter {
    root: PathBuf,
    max_chars: usize,
}

impl FileContentFormatter {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            max_chars: DEFAULT_MAX_FILE_CHARS,
        }
    }

    /// Caps the combined size of all rendered blocks. `0` disables the cap.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn read_block(&self, path: &str) -> Option<FileBlock> {
        // Callers validate first; this guards the filesystem if one forgets.
        if !is_valid_filename(path) {
            debug!("Refusing to read unvalidated path: {:?}", path);
            return None;
        }

        match std::fs::read_to_string(self.root.join(path)) {
            Ok(content) => Some(FileBlock {
                path: path.to_string(),
                content,
            }),
            Err(err) => {
                warn!("Skipping {}: {}", path, err);
                None
            }
        }
    }

    pub fn format(&self, paths: &[String]) -> String {
        let mut seen = HashSet::new();
        let mut output = String::new();
        let mut used_chars = 0usize;

        let blocks = paths
            .iter()
            .filter(|path| seen.insert(path.as_str()))
            .filter_map(|path| self.read_block(path));

        for block in blocks {
            let rendered = block.render();
            let block_chars = rendered.chars().count();
            if self.max_chars > 0 && used_chars.saturating_add(block_chars) > self.max_chars {
                warn!(
                    "Skipping {}: adding {} chars would exceed the {} char file budget",
                    block.path, block_chars, self.max_chars
                );
                continue;
            }
            used_chars += block_chars;
            output.push_str(&rendered);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn renders_fenced_block() {
        let block = FileBlock {
            path: "a.txt".to_string(),
            content: "hello".to_string(),
        };
        assert_eq!(block.render(), "\na.txt\n```\nhello\n```\n");
    }

    #[test]
    fn formats_files_in_order() {
        let dir = fixture(&[("a.txt", "one"), ("b.txt", "two")]);
        let formatter = FileContentFormatter::new(dir.path().to_path_buf());

        let out = formatter.format(&["b.txt".to_string(), "a.txt".to_string()]);
        assert_eq!(out, "\nb.txt\n```\ntwo\n```\n\na.txt\n```\none\n```\n");
    }

    #[test]
    fn skips_missing_and_undecodable_files() {
        let dir = fixture(&[("a.txt", "hello")]);
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let formatter = FileContentFormatter::new(dir.path().to_path_buf());

        let out = formatter.format(&[
            "missing.txt".to_string(),
            "blob.bin".to_string(),
            "a.txt".to_string(),
        ]);
        assert_eq!(out, "\na.txt\n```\nhello\n```\n");
    }

    #[test]
    fn never_reads_unvalidated_paths() {
        let dir = fixture(&[("secret.txt", "token")]);
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let formatter = FileContentFormatter::new(nested);

        assert!(formatter.read_block("../secret.txt").is_none());
        assert!(formatter.format(&["../secret.txt".to_string()]).is_empty());
    }

    #[test]
    fn renders_each_file_once() {
        let dir = fixture(&[("a.txt", "hello")]);
        let formatter = FileContentFormatter::new(dir.path().to_path_buf());

        let out = formatter.format(&["a.txt".to_string(), "a.txt".to_string()]);
        assert_eq!(out.matches("a.txt").count(), 1);
    }

    #[test]
    fn budget_omits_oversized_blocks() {
        let big = "x".repeat(200);
        let dir = fixture(&[("big.txt", big.as_str()), ("small.txt", "ok")]);
        let formatter = FileContentFormatter::new(dir.path().to_path_buf()).with_max_chars(64);

        let out = formatter.format(&["big.txt".to_string(), "small.txt".to_string()]);
        assert_eq!(out, "\nsmall.txt\n```\nok\n```\n");

        let unbounded = FileContentFormatter::new(dir.path().to_path_buf()).with_max_chars(0);
        assert!(unbounded.format(&["big.txt".to_string()]).contains(&big));
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let accented = "é".repeat(20);
        let dir = fixture(&[("e.txt", accented.as_str())]);
        let block = format!("\ne.txt\n```\n{}\n```\n", accented);
        let chars = block.chars().count();
        assert!(block.len() > chars);

        let exact = FileContentFormatter::new(dir.path().to_path_buf()).with_max_chars(chars);
        assert_eq!(exact.format(&["e.txt".to_string()]), block);

        let short = FileContentFormatter::new(dir.path().to_path_buf()).with_max_chars(chars - 1);
        assert!(short.format(&["e.txt".to_string()]).is_empty());
    }
}
