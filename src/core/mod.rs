pub mod diff_annotator;
pub mod git;
pub mod pipeline;
pub mod poster;
pub mod prompt;
pub mod pull_request;
pub mod violation;

pub use git::{DiffRange, GitIntegration};
pub use pipeline::{ReviewOutcome, ReviewPipeline};
pub use poster::CommentPoster;
pub use pull_request::PullRequestRef;
