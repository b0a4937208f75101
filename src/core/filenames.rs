use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Characters allowed in a reviewable filename besides ASCII letters and digits.
const ALLOWED_PUNCTUATION: &str = "-_.() ";

static NEW_FILE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\+\+\+ b/([^\r\n]*)").unwrap());

static ALLOWED_CHARS: Lazy<HashSet<char>> = Lazy::new(|| {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(ALLOWED_PUNCTUATION.chars())
        .collect()
});

/// Returns the "new side" paths of every `+++ b/<path>` header in the diff,
/// in order of appearance. Duplicates are kept.
pub fn extract_filenames(diff: &str) -> Vec<String> {
    NEW_FILE_MARKER
        .captures_iter(diff)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extracts filenames and drops every one that fails [`is_valid_filename`].
pub fn extract_valid_filenames(diff: &str) -> Vec<String> {
    retain_valid(extract_filenames(diff))
}

/// Filters a candidate list down to safe names. Rejections are not errors.
pub fn retain_valid(candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|name| {
            let ok = is_valid_filename(name);
            if !ok {
                debug!("Dropping unsafe filename from diff: {:?}", name);
            }
            ok
        })
        .collect()
}

/// A filename is reviewable when it names an entry of the working directory
/// itself: no parent traversal, no separators, and nothing outside
/// `[A-Za-z0-9-_.() ]`.
pub fn is_valid_filename(path: &str) -> bool {
    if path.contains("..") || path.contains('/') {
        return false;
    }

    let used: HashSet<char> = path.chars().collect();
    used.difference(&ALLOWED_CHARS).next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILE_DIFF: &str = "\
diff --git a/file1.txt b/file1.txt
index 7c4658f..5a5d634 100644
--- a/file1.txt
+++ b/file1.txt
@@ -1 +1 @@
-Old line
+New line
diff --git a/file2.txt b/file2.txt
index 6dcd4cf..7c4658f 100644
--- a/file2.txt
+++ b/file2.txt
@@ -1 +1 @@
-Another old line
+Another new line
";

    #[test]
    fn extracts_files_in_order() {
        assert_eq!(
            extract_filenames(TWO_FILE_DIFF),
            vec!["file1.txt".to_string(), "file2.txt".to_string()]
        );
    }

    #[test]
    fn extraction_is_repeatable() {
        assert_eq!(extract_filenames(TWO_FILE_DIFF), extract_filenames(TWO_FILE_DIFF));
    }

    #[test]
    fn no_markers_means_no_files() {
        assert!(extract_filenames("").is_empty());
        assert!(extract_filenames("--- a/file1.txt\n@@ -1 +1 @@\n-x\n+y\n").is_empty());
        // Added content lines that happen to start with "++" are not headers.
        assert!(extract_filenames("+++ a/file1.txt\n++ b/nope\n").is_empty());
    }

    #[test]
    fn tolerates_indented_diffs_and_crlf() {
        let diff = "    --- a/file1.txt\n    +++ b/file1.txt\r\n    @@ -1 +1 @@\n";
        assert_eq!(extract_filenames(diff), vec!["file1.txt".to_string()]);
    }

    #[test]
    fn keeps_duplicates_and_raw_paths() {
        let diff = "+++ b/a.txt\n+++ b/src/lib.rs\n+++ b/a.txt\n";
        assert_eq!(
            extract_filenames(diff),
            vec!["a.txt".to_string(), "src/lib.rs".to_string(), "a.txt".to_string()]
        );
        assert_eq!(
            extract_valid_filenames(diff),
            vec!["a.txt".to_string(), "a.txt".to_string()]
        );
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(!is_valid_filename("../secret"));
        assert!(!is_valid_filename("a/b"));
        assert!(!is_valid_filename("foo;rm -rf"));
        assert!(!is_valid_filename("..."));
        assert!(!is_valid_filename("name$(whoami)"));
        assert!(!is_valid_filename("tab\there"));
        assert!(!is_valid_filename("naïve.txt"));
    }

    #[test]
    fn accepts_plain_names() {
        assert!(is_valid_filename("My File (v2).txt"));
        assert!(is_valid_filename("Cargo.toml"));
        assert!(is_valid_filename("snake_case-name.rs"));
        assert!(is_valid_filename(".gitignore"));
    }

    fn char_by_char(path: &str) -> bool {
        !path.contains("..")
            && !path.contains('/')
            && path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.() ".contains(c))
    }

    #[test]
    fn set_difference_matches_per_char_rule() {
        let low = (0u32..0x3000).filter_map(char::from_u32);
        let high = (0x3000u32..0x11_0000).step_by(97).filter_map(char::from_u32);

        for c in low.chain(high) {
            for candidate in [c.to_string(), format!("a{c}b"), format!("{c}.txt"), format!("{c}{c}")] {
                assert_eq!(
                    is_valid_filename(&candidate),
                    char_by_char(&candidate),
                    "disagreement on {:?}",
                    candidate
                );
            }
        }
    }
}
