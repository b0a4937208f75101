use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, Repository};
use std::path::Path;

pub struct GitIntegration {
    repo: Repository,
}

impl GitIntegration {
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(repo_path)
            .context("Failed to find git repository")?;
        Ok(Self { repo })
    }

    /// Patch text for `base..HEAD`.
    pub fn get_branch_diff(&self, base: &str) -> Result<String> {
        let base_tree = self
            .repo
            .revparse_single(base)
            .with_context(|| format!("Unknown base revision '{}'", base))?
            .peel_to_commit()?
            .tree()?;
        let head_tree = self.repo.head()?.peel_to_commit()?.tree()?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)?;
        patch_text(&diff)
    }

    pub fn get_current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }
}

fn patch_text(diff: &Diff<'_>) -> Result<String> {
    let mut text = Vec::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        // Content lines come without their origin marker.
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin() as u8);
        }
        text.extend_from_slice(line.content());
        true
    })?;

    Ok(String::from_utf8_lossy(&text).to_string())
}
