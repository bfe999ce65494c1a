use crate::adapters::llm::{LLMAdapter, LLMRequest};
use crate::config::Config;
use crate::core::diff_annotator::summarize_multi_file_diff;
use crate::core::prompt::{load_guidelines, PromptTemplate};
use crate::core::violation::{extract_violations, ViolationRecord};
use crate::error::ReviewError;
use tracing::{debug, error, info};

/// What the model said about a diff.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// Raw model answer.
    pub review: String,
    pub violations: Vec<ViolationRecord>,
}

pub struct ReviewPipeline<'a> {
    config: &'a Config,
    llm: &'a dyn LLMAdapter,
}

impl<'a> ReviewPipeline<'a> {
    pub fn new(config: &'a Config, llm: &'a dyn LLMAdapter) -> Self {
        Self { config, llm }
    }

    /// Review a raw `git diff`.
    ///
    /// Returns `Ok(None)` when there is nothing to send to the model: the
    /// diff is empty or could not be transcribed.
    pub async fn review(&self, raw_diff: &str) -> Result<Option<ReviewOutcome>, ReviewError> {
        let annotated = summarize_multi_file_diff(raw_diff);

        info!("Reading code guidelines...");
        let guidelines = load_guidelines(&self.config.guidelines_path)?;

        info!("Loading prompt template...");
        let template = PromptTemplate::load(&self.config.prompt_path)?;

        let diff = match annotated {
            Ok(diff) => diff,
            Err(e) => {
                error!("Skipping review: {}", e);
                return Ok(None);
            }
        };
        if diff.trim().is_empty() {
            info!(
                "No changes to {} files; nothing to review",
                self.config.pathspec()
            );
            return Ok(None);
        }

        let prompt = template.render_review(&guidelines, &diff)?;
        debug!("Prompt is {} characters", prompt.len());

        info!("Requesting code review from {}...", self.llm.model_name());
        let response = self
            .llm
            .complete(LLMRequest { prompt })
            .await
            .map_err(ReviewError::Llm)?;
        if let Some(usage) = &response.usage {
            debug!(
                "{} used {} prompt / {} completion tokens",
                response.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        info!("Parsing review comments...");
        let violations = extract_violations(&response.content);
        info!("Model reported {} violations", violations.len());

        Ok(Some(ReviewOutcome {
            review: response.content,
            violations,
        }))
    }
}
