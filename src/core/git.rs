use crate::error::ReviewError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// The two revisions a review compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRange {
    /// Remote-tracking branches of a pull request's base and head.
    PullRequest { base_ref: String, head_ref: String },
    /// Whatever `ORIG_HEAD` and `HEAD` point at in the local checkout.
    Local,
}

/// Thin wrapper around the `git` binary.
pub struct GitIntegration {
    repo_path: PathBuf,
}

impl GitIntegration {
    pub fn new(repo_path: impl AsRef<Path>) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, ReviewError> {
        debug!("Running git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| ReviewError::Git(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReviewError::Git(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String, ReviewError> {
        Ok(self.run(&["rev-parse", rev])?.trim().to_string())
    }

    /// `git diff <base>...<head> -- <pathspec>`
    pub fn diff_between(
        &self,
        base: &str,
        head: &str,
        pathspec: &str,
    ) -> Result<String, ReviewError> {
        let range = format!("{}...{}", base, head);
        self.run(&["diff", &range, "--", pathspec])
    }

    pub fn diff_for(&self, range: &DiffRange, pathspec: &str) -> Result<String, ReviewError> {
        match range {
            DiffRange::PullRequest { base_ref, head_ref } => self.diff_between(
                &format!("origin/{}", base_ref),
                &format!("origin/{}", head_ref),
                pathspec,
            ),
            DiffRange::Local => {
                let checkout = self.rev_parse("ORIG_HEAD")?;
                let current = self.rev_parse("HEAD")?;
                self.diff_between(&checkout, &current, pathspec)
            }
        }
    }
}
