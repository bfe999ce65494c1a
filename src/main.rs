mod adapters;
mod config;
mod core;
mod error;

use adapters::{GitHubClient, ReviewHost};
use clap::Parser;
use error::ReviewError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guideline-review")]
#[command(
    about = "Review pull request changes against the project's code guidelines with Gemini",
    long_about = "Reviews the diff of the current pull request (or ORIG_HEAD...HEAD locally) \
against docs/code-guidelines.md and posts every violation as a review comment.\n\n\
Environment:\n  \
  GOOGLE_API_KEY     Gemini API key (required)\n  \
  GITHUB_TOKEN       token used to post comments (optional)\n  \
  GITHUB_REPOSITORY  owner/repo of the pull request\n  \
  GITHUB_REF         refs/pull/<number>/merge\n  \
  GITHUB_EVENT_PATH  event payload with pull_request.number"
)]
#[command(version)]
struct Cli {
    /// Configuration file (default: .guideline-review.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Working tree to diff
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Print the review instead of posting comments
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), ReviewError> {
    let mut config = config::Config::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    let api_key = config.require_google_api_key()?.to_string();
    config.warn_about_optional_credentials();

    let github = GitHubClient::new(
        config.github_api_url.as_deref(),
        config.github_token.as_deref(),
    )
    .map_err(ReviewError::GitHub)?;
    let pr = core::PullRequestRef::resolve(&config.ci);

    info!("Fetching git changes...");
    let range = match &pr {
        Some(pr) => {
            let info = github.pull_request(pr).await.map_err(ReviewError::GitHub)?;
            info!("Reviewing {} ({} -> {})", pr, info.head_ref, info.base_ref);
            core::DiffRange::PullRequest {
                base_ref: info.base_ref,
                head_ref: info.head_ref,
            }
        }
        None => core::DiffRange::Local,
    };
    let raw_diff =
        core::GitIntegration::new(&cli.repo_path).diff_for(&range, &config.pathspec())?;

    let model_config = adapters::llm::ModelConfig {
        model_name: config.model.clone(),
        api_key,
        base_url: config.gemini_base_url.clone(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    };
    let adapter = adapters::llm::create_adapter(&model_config)
        .map_err(|e| ReviewError::Config(format!("{:#}", e)))?;

    let pipeline = core::ReviewPipeline::new(&config, adapter.as_ref());
    let Some(outcome) = pipeline.review(&raw_diff).await? else {
        return Ok(());
    };

    if cli.dry_run {
        println!("{}", format_review(&outcome));
        return Ok(());
    }

    publish(&config, &github, pr.as_ref(), &outcome).await;
    Ok(())
}

/// Post the outcome on the pull request when possible, else print it.
/// Posting problems are logged; they never fail the run.
async fn publish(
    config: &config::Config,
    github: &GitHubClient,
    pr: Option<&core::PullRequestRef>,
    outcome: &core::ReviewOutcome,
) {
    if !github.has_token() {
        info!("Skipping PR comments: GITHUB_TOKEN not set");
        println!("{}", format_review(outcome));
        return;
    }
    let Some(pr) = pr else {
        info!("Skipping PR comments: could not determine PR information");
        println!("{}", format_review(outcome));
        return;
    };

    info!("Posting review as line-specific PR comments...");
    let poster = core::CommentPoster::new(github as &dyn ReviewHost, pr, config.comment_mode);
    match poster.post(&outcome.violations).await {
        Ok(summary) if summary.failed > 0 => warn!(
            "Posted {} comments to {}, {} failed",
            summary.posted, pr, summary.failed
        ),
        Ok(summary) => info!("Posted {} comments to {}", summary.posted, pr),
        Err(e) => error!("Error posting comments to PR: {}", e),
    }
}

fn format_review(outcome: &core::ReviewOutcome) -> String {
    if outcome.violations.is_empty() {
        return format!("=== CODE REVIEW RESULTS ===\n\n{}", outcome.review.trim());
    }

    let mut output = format!(
        "=== CODE REVIEW RESULTS ({} violations) ===\n",
        outcome.violations.len()
    );
    for violation in &outcome.violations {
        let location = match violation.range_start() {
            Some(start) => format!("{}:{}-{}", violation.file, start, violation.anchor_line()),
            None => format!("{}:{}", violation.file, violation.anchor_line()),
        };
        output.push_str(&format!("\n{} {}\n", location, violation.guideline));
        if !violation.explanation.is_empty() {
            output.push_str(&format!("  {}\n", violation.explanation));
        }
        if let Some(code) = violation.suggestion_code.as_deref().filter(|c| !c.is_empty()) {
            for line in code.lines() {
                output.push_str(&format!("  > {}\n", line));
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_review_is_printed_verbatim() {
        let outcome = crate::core::ReviewOutcome {
            review: "  No violations of the code guidelines were found.\n".into(),
            violations: Vec::new(),
        };
        assert_eq!(
            format_review(&outcome),
            "=== CODE REVIEW RESULTS ===\n\nNo violations of the code guidelines were found."
        );
    }

    #[test]
    fn violations_are_listed_with_locations() {
        let violations = crate::core::violation::extract_violations(
            r#"{"violations":[
                {"file":"A.java","line":10,"startLine":8,"guideline":"G1","explanation":"E1","suggestionCode":"a\nb"},
                {"file":"B.java","line":3,"guideline":"G2","explanation":""}
            ]}"#,
        );
        let output = format_review(&crate::core::ReviewOutcome {
            review: String::new(),
            violations,
        });

        assert!(output.starts_with("=== CODE REVIEW RESULTS (2 violations) ==="));
        assert!(output.contains("\nA.java:8-10 G1\n  E1\n  > a\n  > b\n"));
        assert!(output.contains("\nB.java:3 G2\n"));
    }

    #[test]
    fn cli_has_no_required_flags() {
        let cli = Cli::try_parse_from(["guideline-review"]).unwrap();
        assert!(!cli.dry_run);
        assert_eq!(cli.repo_path, PathBuf::from("."));
        assert!(cli.config.is_none());
    }
}
