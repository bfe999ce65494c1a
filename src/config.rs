use crate::error::ReviewError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE_NAMES: [&str; 2] = [".guideline-review.yml", ".guideline-review.yaml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub model: String,

    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,

    #[serde(default = "default_guidelines_path")]
    pub guidelines_path: PathBuf,

    #[serde(default = "default_prompt_path")]
    pub prompt_path: PathBuf,

    /// Only files with this extension end up in the reviewed diff.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    #[serde(default)]
    pub comment_mode: CommentMode,

    pub gemini_base_url: Option<String>,
    pub github_api_url: Option<String>,

    #[serde(skip)]
    pub google_api_key: Option<String>,
    #[serde(skip)]
    pub github_token: Option<String>,
    #[serde(skip)]
    pub ci: CiContext,
}

/// How findings are published on the pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    /// One review comment per violation, anchored to its lines.
    #[default]
    Inline,
    /// A single issue comment listing every violation.
    Summary,
}

/// Values the CI runner exposes about the triggering event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub repository: Option<String>,
    pub git_ref: Option<String>,
    pub event_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_output_tokens: None,
            guidelines_path: default_guidelines_path(),
            prompt_path: default_prompt_path(),
            file_extension: default_file_extension(),
            comment_mode: CommentMode::default(),
            gemini_base_url: None,
            github_api_url: None,
            google_api_key: None,
            github_token: None,
            ci: CiContext::default(),
        }
    }
}

impl Config {
    /// Load the config file: an explicit path must exist, otherwise the
    /// working directory and then the home directory are searched.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ReviewError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ReviewError::MissingFile(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        for name in CONFIG_FILE_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(CONFIG_FILE_NAMES[0]);
            if home_config.exists() {
                return Self::from_file(&home_config);
            }
        }

        Ok(Config::default())
    }

    fn from_file(path: &Path) -> Result<Self, ReviewError> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Overlay credentials and CI context read through `lookup`.
    ///
    /// This is the only place the process environment feeds into a run;
    /// `main` passes `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        self.google_api_key = get("GOOGLE_API_KEY");
        self.github_token = get("GITHUB_TOKEN");
        if let Some(model) = get("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(url) = get("GITHUB_API_URL") {
            self.github_api_url = Some(url);
        }
        self.ci = CiContext {
            repository: get("GITHUB_REPOSITORY"),
            git_ref: get("GITHUB_REF"),
            event_path: get("GITHUB_EVENT_PATH").map(PathBuf::from),
        };
    }

    pub fn require_google_api_key(&self) -> Result<&str, ReviewError> {
        self.google_api_key.as_deref().ok_or_else(|| {
            ReviewError::Config(
                "GOOGLE_API_KEY environment variable is not set. \
                 Set it with: export GOOGLE_API_KEY='your-api-key'"
                    .to_string(),
            )
        })
    }

    /// Git pathspec selecting the reviewed files, e.g. `*.java`.
    pub fn pathspec(&self) -> String {
        format!("*.{}", self.file_extension.trim_start_matches(['*', '.']))
    }

    pub fn warn_about_optional_credentials(&self) {
        if self.github_token.is_none() {
            warn!("GITHUB_TOKEN is not set; PR comments will not be posted");
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_guidelines_path() -> PathBuf {
    PathBuf::from("docs/code-guidelines.md")
}

fn default_prompt_path() -> PathBuf {
    PathBuf::from("scripts/ai-code-reviewer/prompt.toml")
}

fn default_file_extension() -> String {
    "java".to_string()
}
