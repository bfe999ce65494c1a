use std::path::PathBuf;

/// Every way a review run can fail.
///
/// Helpers return this instead of exiting; `main` is the only place that
/// turns a failure into a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Missing credential or unusable configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required input document does not exist.
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The `git` process failed or could not be started.
    #[error("git command failed: {0}")]
    Git(String),

    /// The diff text could not be transcribed.
    #[error("malformed diff: {0}")]
    Diff(String),

    /// The prompt template could not be rendered.
    #[error("prompt template error: {0}")]
    Prompt(String),

    #[error("LLM request failed: {0:#}")]
    Llm(anyhow::Error),

    #[error("GitHub API request failed: {0:#}")]
    GitHub(anyhow::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ReviewError {
    /// Process exit code for this failure: `2` when the run could not start
    /// because of configuration, `1` for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReviewError::Config(_)
            | ReviewError::MissingFile(_)
            | ReviewError::Prompt(_)
            | ReviewError::Toml(_)
            | ReviewError::Yaml(_) => 2,
            ReviewError::Io(_)
            | ReviewError::Git(_)
            | ReviewError::Diff(_)
            | ReviewError::Llm(_)
            | ReviewError::GitHub(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_failures_exit_with_two() {
        assert_eq!(ReviewError::Config("GOOGLE_API_KEY".into()).exit_code(), 2);
        assert_eq!(
            ReviewError::MissingFile(PathBuf::from("docs/code-guidelines.md")).exit_code(),
            2
        );
    }

    #[test]
    fn external_failures_exit_with_one() {
        assert_eq!(ReviewError::Git("exit status 128".into()).exit_code(), 1);
        assert_eq!(
            ReviewError::Llm(anyhow::anyhow!("quota exceeded")).exit_code(),
            1
        );
    }

    #[test]
    fn llm_error_shows_full_chain() {
        let err = ReviewError::Llm(anyhow::anyhow!("status 429").context("Gemini call failed"));
        let message = err.to_string();
        assert!(message.contains("Gemini call failed"));
        assert!(message.contains("status 429"));
    }

    #[test]
    fn missing_file_shows_path() {
        let err = ReviewError::MissingFile(PathBuf::from("scripts/prompt.toml"));
        assert!(err.to_string().contains("scripts/prompt.toml"));
    }
}
