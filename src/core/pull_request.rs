use crate::config::CiContext;
use std::fmt;
use tracing::{info, warn};

/// Identifies one pull request on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl PullRequestRef {
    /// Work out which pull request triggered the CI run.
    ///
    /// The number comes from a `refs/pull/<n>/merge` ref, or else from
    /// `pull_request.number` in the event payload. Returns `None` when the
    /// run was not triggered by a pull request.
    pub fn resolve(ci: &CiContext) -> Option<Self> {
        let number = ci
            .git_ref
            .as_deref()
            .and_then(number_from_ref)
            .or_else(|| ci.event_path.as_deref().and_then(number_from_event));

        let (Some(repository), Some(number)) = (ci.repository.as_deref(), number) else {
            info!("Could not determine PR information from the CI environment");
            return None;
        };

        let number: u64 = match number.parse() {
            Ok(n) => n,
            Err(_) => {
                warn!("Invalid PR number: {}", number);
                return None;
            }
        };

        let Some((owner, repo)) = repository.split_once('/') else {
            warn!("Invalid repository name, expected owner/repo: {}", repository);
            return None;
        };

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

fn number_from_ref(git_ref: &str) -> Option<String> {
    let rest = git_ref.strip_prefix("refs/pull/")?;
    let number = rest.strip_suffix("/merge")?;
    Some(number.to_string())
}

fn number_from_event(path: &std::path::Path) -> Option<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Error reading event file {}: {}", path.display(), e);
            return None;
        }
    };
    let event: serde_json::Value = match serde_json::from_str(&content) {
        Ok(event) => event,
        Err(e) => {
            warn!("Error parsing event file {}: {}", path.display(), e);
            return None;
        }
    };

    match event.get("pull_request")?.get("number")? {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
