use std::path::Path;

use git2::{Repository, StatusOptions};
use tracing::debug;

use crate::error::{Error, Result};

/// Open the repository containing `path`
///
/// Fails with [`Error::NotInGitRepo`] when `path` is not inside a work tree.
pub fn open_repository(path: &Path) -> Result<Repository> {
    match Repository::discover(path) {
        Ok(repo) => {
            debug!(git_dir = %repo.path().display(), "found repository");
            Ok(repo)
        }
        Err(err) => {
            debug!(%err, "repository discovery failed");
            Err(Error::NotInGitRepo)
        }
    }
}

/// Short name of the checked out branch, `HEAD` when detached
pub fn current_branch(repo: &Repository) -> Result<String> {
    let head = repo.head()?;
    if !head.is_branch() {
        return Ok("HEAD".to_string());
    }

    head.shorthand()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput("branch name is not valid UTF-8".into()))
}

/// Whether tracked files have changes that are not committed
///
/// Always `false` for a bare repository, which has no work tree.
pub fn has_uncommitted_changes(repo: &Repository) -> Result<bool> {
    if repo.is_bare() {
        return Ok(false);
    }

    let mut options = StatusOptions::new();
    options.include_untracked(false).include_ignored(false);

    let statuses = repo.statuses(Some(&mut options))?;
    Ok(!statuses.is_empty())
}
