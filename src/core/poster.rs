use crate::adapters::github::{ReviewCommentRequest, ReviewHost};
use crate::config::CommentMode;
use crate::core::pull_request::PullRequestRef;
use crate::core::violation::ViolationRecord;
use crate::error::ReviewError;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostSummary {
    pub posted: usize,
    pub failed: usize,
}

/// Publishes violation records on a pull request.
pub struct CommentPoster<'a> {
    host: &'a dyn ReviewHost,
    pr: &'a PullRequestRef,
    mode: CommentMode,
}

impl<'a> CommentPoster<'a> {
    pub fn new(host: &'a dyn ReviewHost, pr: &'a PullRequestRef, mode: CommentMode) -> Self {
        Self { host, pr, mode }
    }

    /// Post every record. A record the host rejects is logged and counted
    /// in [`PostSummary::failed`]; only failures that stop all posting
    /// (no commit to anchor on, summary comment rejected) return an error.
    pub async fn post(&self, violations: &[ViolationRecord]) -> Result<PostSummary, ReviewError> {
        if violations.is_empty() {
            info!("No specific violations found to comment on");
            return Ok(PostSummary::default());
        }

        match self.mode {
            CommentMode::Inline => self.post_inline(violations).await,
            CommentMode::Summary => {
                self.host
                    .create_issue_comment(self.pr, &summary_body(violations))
                    .await
                    .map_err(ReviewError::GitHub)?;
                Ok(PostSummary {
                    posted: 1,
                    failed: 0,
                })
            }
        }
    }

    async fn post_inline(&self, violations: &[ViolationRecord]) -> Result<PostSummary, ReviewError> {
        let commit = self
            .host
            .latest_commit(self.pr)
            .await
            .map_err(ReviewError::GitHub)?
            .ok_or_else(|| {
                ReviewError::GitHub(anyhow::anyhow!("No commits found in {}", self.pr))
            })?;

        let mut summary = PostSummary::default();
        for violation in violations {
            let request = review_comment_request(violation, &commit);
            match self.host.create_review_comment(self.pr, &request).await {
                Ok(()) => summary.posted += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        ?violation,
                        "Failed to post comment on {}:{}: {:#}", violation.file, request.line, e
                    );
                }
            }
        }
        Ok(summary)
    }
}

/// Build the inline comment for one record, anchored on `commit`.
pub fn review_comment_request(violation: &ViolationRecord, commit: &str) -> ReviewCommentRequest {
    let side = violation.side.as_str().to_string();
    let start_line = violation.range_start();
    ReviewCommentRequest {
        body: violation.comment_body(),
        commit_id: commit.to_string(),
        path: violation.file.clone(),
        line: violation.anchor_line(),
        start_side: start_line.map(|_| side.clone()),
        side,
        start_line,
    }
}

/// Markdown listing of every violation, for a single issue comment.
pub fn summary_body(violations: &[ViolationRecord]) -> String {
    let mut body = String::from("## Code guideline review\n\n");
    body.push_str(&format!(
        "Found {} guideline violation{}.\n",
        violations.len(),
        if violations.len() == 1 { "" } else { "s" }
    ));

    for violation in violations {
        let lines = match violation.range_start() {
            Some(start) => format!("lines {}-{}", start, violation.anchor_line()),
            None => format!("line {}", violation.anchor_line()),
        };
        body.push_str(&format!("\n### `{}` {}\n\n", violation.file, lines));
        if !violation.guideline.is_empty() {
            body.push_str(&format!("**{}**\n\n", violation.guideline));
        }
        if !violation.explanation.is_empty() {
            body.push_str(&format!("{}\n", violation.explanation));
        }
        if let Some(code) = violation.suggestion_code.as_deref().filter(|c| !c.is_empty()) {
            body.push_str(&format!("\nSuggested change:\n\n```\n{}\n```\n", code));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::github::PullRequestInfo;
    use crate::core::violation::DiffSide;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        latest: Option<String>,
        reject_paths: Vec<String>,
        review_comments: Mutex<Vec<ReviewCommentRequest>>,
        issue_comments: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReviewHost for RecordingHost {
        async fn pull_request(&self, _pr: &PullRequestRef) -> anyhow::Result<PullRequestInfo> {
            anyhow::bail!("not used")
        }

        async fn latest_commit(&self, _pr: &PullRequestRef) -> anyhow::Result<Option<String>> {
            Ok(self.latest.clone())
        }

        async fn create_review_comment(
            &self,
            _pr: &PullRequestRef,
            comment: &ReviewCommentRequest,
        ) -> anyhow::Result<()> {
            if self.reject_paths.contains(&comment.path) {
                anyhow::bail!("422 line must be part of the diff");
            }
            self.review_comments.lock().unwrap().push(comment.clone());
            Ok(())
        }

        async fn create_issue_comment(&self, _pr: &PullRequestRef, body: &str) -> anyhow::Result<()> {
            self.issue_comments.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn pr() -> PullRequestRef {
        PullRequestRef {
            owner: "octo".into(),
            repo: "demo".into(),
            number: 9,
        }
    }

    fn violation(file: &str, line: u64, start_line: Option<u64>) -> ViolationRecord {
        ViolationRecord {
            file: file.into(),
            line,
            start_line,
            end_line: None,
            guideline: "G1".into(),
            explanation: "E1".into(),
            suggestion_code: Some("x".into()),
            side: DiffSide::Right,
        }
    }

    #[test]
    fn single_line_request_has_no_range() {
        let request = review_comment_request(&violation("A.java", 10, None), "sha");
        assert_eq!(request.line, 10);
        assert_eq!(request.start_line, None);
        assert_eq!(request.start_side, None);
        assert_eq!(request.side, "RIGHT");
        assert_eq!(request.body, "G1\nE1\n```suggestion\nx\n```");
    }

    #[test]
    fn range_request_mirrors_side() {
        let mut record = violation("A.java", 12, Some(8));
        record.side = DiffSide::Left;
        let request = review_comment_request(&record, "sha");
        assert_eq!(request.start_line, Some(8));
        assert_eq!(request.side, "LEFT");
        assert_eq!(request.start_side.as_deref(), Some("LEFT"));
    }

    #[tokio::test]
    async fn one_failed_comment_does_not_block_the_rest() {
        let host = RecordingHost {
            latest: Some("head-sha".into()),
            reject_paths: vec!["Bad.java".into()],
            ..RecordingHost::default()
        };
        let pr = pr();
        let poster = CommentPoster::new(&host, &pr, CommentMode::Inline);

        let summary = poster
            .post(&[
                violation("A.java", 3, None),
                violation("Bad.java", 4, None),
                violation("C.java", 9, Some(5)),
            ])
            .await
            .unwrap();

        assert_eq!(summary, PostSummary { posted: 2, failed: 1 });
        let posted = host.review_comments.lock().unwrap();
        assert_eq!(posted.len(), 2);
        assert!(posted.iter().all(|c| c.commit_id == "head-sha"));
        assert_eq!(posted[1].path, "C.java");
        assert_eq!(posted[1].start_line, Some(5));
    }

    #[tokio::test]
    async fn no_commits_is_an_error() {
        let host = RecordingHost::default();
        let pr = pr();
        let poster = CommentPoster::new(&host, &pr, CommentMode::Inline);
        let err = poster.post(&[violation("A.java", 1, None)]).await.unwrap_err();
        assert!(err.to_string().contains("No commits found in octo/demo#9"));
    }

    #[tokio::test]
    async fn nothing_to_post_makes_no_calls() {
        let host = RecordingHost::default();
        let pr = pr();
        let poster = CommentPoster::new(&host, &pr, CommentMode::Inline);
        assert_eq!(poster.post(&[]).await.unwrap(), PostSummary::default());
        assert!(host.review_comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_mode_posts_one_issue_comment() {
        let host = RecordingHost::default();
        let pr = pr();
        let poster = CommentPoster::new(&host, &pr, CommentMode::Summary);

        let summary = poster
            .post(&[violation("A.java", 3, None), violation("B.java", 9, Some(5))])
            .await
            .unwrap();

        assert_eq!(summary, PostSummary { posted: 1, failed: 0 });
        let bodies = host.issue_comments.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].contains("Found 2 guideline violations."));
        assert!(bodies[0].contains("### `A.java` line 3"));
        assert!(bodies[0].contains("### `B.java` lines 5-9"));
        assert!(host.review_comments.lock().unwrap().is_empty());
    }
}
