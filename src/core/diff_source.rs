use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::git::GitIntegration;

/// Where the text under review comes from.
#[derive(Debug, Clone)]
pub enum DiffSource {
    /// A single file, presented as a fenced block.
    File(PathBuf),
    /// Every non-ignored file below a directory, each as a fenced block.
    Dir(PathBuf),
    Stdin,
    /// `base..HEAD` of the enclosing repository.
    Git { base: String },
}

impl DiffSource {
    pub fn read(&self) -> Result<String> {
        match self {
            DiffSource::File(path) => fenced_file(path),
            DiffSource::Dir(dir) => walk_dir(dir),
            DiffSource::Stdin => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read diff from stdin")?;
                Ok(buffer)
            }
            DiffSource::Git { base } => {
                let git = GitIntegration::new(".")?;
                let branch = git.get_current_branch()?;
                info!("Diffing {}..{}", base, branch);

                let diff = git.get_branch_diff(base)?;
                if diff.is_empty() {
                    Ok(format!("No differences between {} and current branch.", base))
                } else {
                    Ok(diff)
                }
            }
        }
    }
}

fn fence(path: &Path, content: &str) -> String {
    format!("\n{}\n```\n{}\n```", path.display(), content)
}

fn fenced_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("File {} not found or unreadable", path.display()))?;
    Ok(fence(path, &content))
}

fn walk_dir(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        anyhow::bail!("The provided directory {} does not exist.", dir.display());
    }

    let mut output = String::new();
    // Dotfiles are reviewed too; only the repository metadata is left out.
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().map_or(false, |ft| ft.is_file()) {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => output.push_str(&fence(entry.path(), &content)),
            Err(err) => warn!("Skipping {}: {}", entry.path().display(), err),
        }
    }

    Ok(output)
}
