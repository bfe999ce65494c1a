use crate::error::ReviewError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PromptFile {
    prompt: PromptSection,
}

#[derive(Debug, Deserialize)]
struct PromptSection {
    content: String,
}

/// Review prompt with `{name}` placeholders. `{{` and `}}` stand for
/// literal braces so the template can embed JSON examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    content: String,
}

impl PromptTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Read `prompt.content` from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ReviewError> {
        if !path.exists() {
            return Err(ReviewError::MissingFile(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let file: PromptFile = toml::from_str(&raw)?;
        Ok(Self::new(file.prompt.content))
    }

    /// Substitute every placeholder in one pass, so braces inside the
    /// substituted values are left alone.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, ReviewError> {
        let mut out = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                return Err(ReviewError::Prompt(
                    "single '}' encountered in prompt template".to_string(),
                ));
            } else {
                let close = tail.find('}').ok_or_else(|| {
                    ReviewError::Prompt("single '{' encountered in prompt template".to_string())
                })?;
                let name = &tail[1..close];
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        ReviewError::Prompt(format!("unknown placeholder {{{}}}", name))
                    })?;
                out.push_str(value);
                rest = &tail[close + 1..];
            }
        }

        out.push_str(rest);
        Ok(out)
    }

    pub fn render_review(&self, guidelines: &str, diff: &str) -> Result<String, ReviewError> {
        self.render(&[("guidelines", guidelines), ("diff", diff)])
    }
}

/// Read the guideline document the review is checked against.
pub fn load_guidelines(path: &Path) -> Result<String, ReviewError> {
    if !path.exists() {
        return Err(ReviewError::MissingFile(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}
