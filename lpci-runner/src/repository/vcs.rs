//! Version control repository
//!
//! Build tags are the only state the base workflow persists. They are
//! managed through the git CLI in the checkout the workflow runs from.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, WorkflowError};

/// Remote build tags are pushed to
pub const REMOTE: &str = "origin";

/// Repository trait for git operations
pub trait VcsRepository: Send + Sync {
    /// Name of the checked out branch
    fn current_branch(&self) -> Result<String>;

    /// Tags pointing at HEAD
    fn tags_at_head(&self) -> Result<Vec<String>>;

    /// Tags anywhere in the repository matching a `git tag --list` glob
    fn tags_matching(&self, pattern: &str) -> Result<Vec<String>>;

    /// Creates a lightweight tag at HEAD
    fn create_tag(&self, tag: &str) -> Result<()>;

    /// Pushes a tag to the remote
    fn push_tag(&self, tag: &str) -> Result<()>;

    /// Removes a tag from the remote
    fn delete_remote_tag(&self, tag: &str) -> Result<()>;

    /// Removes a local tag
    fn delete_tag(&self, tag: &str) -> Result<()>;
}

/// Git CLI implementation of VcsRepository
#[derive(Debug, Clone)]
pub struct GitRepository {
    work_dir: PathBuf,
}

impl GitRepository {
    /// Creates a repository rooted at `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        debug!("git {}", command);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| WorkflowError::Vcs {
                command: command.clone(),
                message: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkflowError::Vcs {
                command,
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VcsRepository for GitRepository {
    fn current_branch(&self) -> Result<String> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.trim();
        if branch.is_empty() || branch == "HEAD" {
            return Err(WorkflowError::Vcs {
                command: "rev-parse --abbrev-ref HEAD".to_string(),
                message: "HEAD is not on a branch".to_string(),
            });
        }
        Ok(branch.to_string())
    }

    fn tags_at_head(&self) -> Result<Vec<String>> {
        self.git(&["tag", "--points-at", "HEAD"]).map(|out| tag_lines(&out))
    }

    fn tags_matching(&self, pattern: &str) -> Result<Vec<String>> {
        self.git(&["tag", "--list", pattern]).map(|out| tag_lines(&out))
    }

    fn create_tag(&self, tag: &str) -> Result<()> {
        self.git(&["tag", tag]).map(drop)
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        self.git(&["push", REMOTE, tag]).map(drop)
    }

    fn delete_remote_tag(&self, tag: &str) -> Result<()> {
        let refspec = format!(":{tag}");
        self.git(&["push", REMOTE, &refspec]).map(drop)
    }

    fn delete_tag(&self, tag: &str) -> Result<()> {
        self.git(&["tag", "--delete", tag]).map(drop)
    }
}

fn tag_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
