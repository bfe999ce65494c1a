use crate::error::ReviewError;
use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+).* \+(\d+).* @@").expect("valid hunk header regex"));

const NEW_PATH_PREFIX: &str = "+++ b/";

/// Lines collected for one `diff --git` block.
#[derive(Debug, Default)]
struct DiffHunkRecord {
    file_path: Option<String>,
    old_lines: Vec<String>,
    new_lines: Vec<String>,
    old_num: Option<usize>,
    new_num: Option<usize>,
}

impl DiffHunkRecord {
    fn flush_into(&mut self, out: &mut Vec<String>) {
        let record = std::mem::take(self);
        let Some(path) = record.file_path.filter(|path| !path.is_empty()) else {
            return;
        };

        out.push(format!("filePath: {}", path));
        if !record.old_lines.is_empty() {
            out.push("old_hunk (before change):".to_string());
            out.extend(record.old_lines);
        }
        if !record.new_lines.is_empty() {
            out.push("\nnew_hunk (after change):".to_string());
            out.extend(record.new_lines);
        }
        out.push(String::new());
    }

    fn take_old(&mut self, line: &str) -> Result<usize, ReviewError> {
        let num = self.old_num.ok_or_else(|| self.missing_header(line))?;
        self.old_num = Some(self.next_line(num, line)?);
        Ok(num)
    }

    fn take_new(&mut self, line: &str) -> Result<usize, ReviewError> {
        let num = self.new_num.ok_or_else(|| self.missing_header(line))?;
        self.new_num = Some(self.next_line(num, line)?);
        Ok(num)
    }

    fn next_line(&self, num: usize, line: &str) -> Result<usize, ReviewError> {
        num.checked_add(1).ok_or_else(|| {
            ReviewError::Diff(format!(
                "line number overflow in {}: {:?}",
                self.file_path.as_deref().unwrap_or("<unknown file>"),
                line
            ))
        })
    }

    fn missing_header(&self, line: &str) -> ReviewError {
        ReviewError::Diff(format!(
            "change line without a preceding hunk header in {}: {:?}",
            self.file_path.as_deref().unwrap_or("<unknown file>"),
            line
        ))
    }
}

/// Transcribe a multi-file unified diff into the annotated listing sent to
/// the model: per file, the old and new sides of every hunk with their line
/// numbers.
///
/// A change line that shows up before any well-formed `@@` header of its
/// file block has no line number to attach and is reported as
/// [`ReviewError::Diff`].
pub fn summarize_multi_file_diff(diff_text: &str) -> Result<String, ReviewError> {
    let mut results = Vec::new();
    let mut record = DiffHunkRecord::default();

    for line in diff_text.lines() {
        if line.starts_with("diff --git") {
            record.flush_into(&mut results);
            continue;
        }

        if let Some(path) = line.strip_prefix(NEW_PATH_PREFIX) {
            let path = path.trim();
            record.file_path = (!path.is_empty()).then(|| path.to_string());
        } else if line.starts_with("@@") {
            if let Some(caps) = HUNK_HEADER.captures(line) {
                record.old_num = caps[1].parse().ok();
                record.new_num = caps[2].parse().ok();
            }
        } else if let Some(content) = line.strip_prefix('-') {
            if line.starts_with("---") {
                continue;
            }
            let num = record.take_old(line)?;
            record.old_lines.push(format!("-{:>4} | {}", num, content));
        } else if let Some(content) = line.strip_prefix('+') {
            if line.starts_with("+++") {
                continue;
            }
            let num = record.take_new(line)?;
            record.new_lines.push(format!("+{:>4} | {}", num, content));
        } else if let Some(content) = line.strip_prefix(' ') {
            let old = record.take_old(line)?;
            let new = record.take_new(line)?;
            record.old_lines.push(format!(" {:>4} | {}", old, content));
            record.new_lines.push(format!(" {:>4} | {}", new, content));
        }
    }

    record.flush_into(&mut results);
    Ok(results.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILE_DIFF: &str = "\
diff --git a/src/main/java/Foo.java b/src/main/java/Foo.java
index 1111111..2222222 100644
--- a/src/main/java/Foo.java
+++ b/src/main/java/Foo.java
@@ -10,3 +10,3 @@ public class Foo {
     int a = 1;
-    int b = 2;
+    int b = 3;
     int c = 4;
diff --git a/src/main/java/Bar.java b/src/main/java/Bar.java
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/src/main/java/Bar.java
@@ -0,0 +1,2 @@
+class Bar {
+}
";

    #[test]
    fn empty_diff_yields_empty_transcript() {
        assert_eq!(summarize_multi_file_diff("").unwrap(), "");
    }

    #[test]
    fn numbers_follow_hunk_start_and_offset() {
        let transcript = summarize_multi_file_diff(TWO_FILE_DIFF).unwrap();
        let lines: Vec<&str> = transcript.lines().collect();

        assert!(lines.contains(&"   10 |     int a = 1;"));
        assert!(lines.contains(&"-  11 |     int b = 2;"));
        assert!(lines.contains(&"   12 |     int c = 4;"));
        assert!(lines.contains(&"+  11 |     int b = 3;"));
        assert!(lines.contains(&"+   1 | class Bar {"));
        assert!(lines.contains(&"+   2 | }"));
    }

    #[test]
    fn one_file_header_per_touched_file() {
        let transcript = summarize_multi_file_diff(TWO_FILE_DIFF).unwrap();
        let headers: Vec<&str> = transcript
            .lines()
            .filter(|l| l.starts_with("filePath: "))
            .collect();
        assert_eq!(
            headers,
            vec![
                "filePath: src/main/java/Foo.java",
                "filePath: src/main/java/Bar.java"
            ]
        );
    }

    #[test]
    fn block_layout_matches_transcript_format() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ -3,1 +3,1 @@
-old
+new
";
        let expected = "filePath: A.java\n\
old_hunk (before change):\n\
-   3 | old\n\
\nnew_hunk (after change):\n\
+   3 | new\n";
        assert_eq!(summarize_multi_file_diff(diff).unwrap(), expected);
    }

    #[test]
    fn context_only_diff_has_identical_sides() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ -5,2 +5,2 @@
 first
 second
";
        let transcript = summarize_multi_file_diff(diff).unwrap();
        let old: Vec<&str> = transcript
            .split("old_hunk (before change):\n")
            .nth(1)
            .unwrap()
            .split("\n\nnew_hunk")
            .next()
            .unwrap()
            .lines()
            .collect();
        let new: Vec<&str> = transcript
            .split("new_hunk (after change):\n")
            .nth(1)
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(old, vec!["    5 | first", "    6 | second"]);
        assert_eq!(old, new);
    }

    #[test]
    fn second_hunk_resets_counters() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ -1,1 +1,1 @@
-a
+b
@@ -40,1 +42,1 @@
-c
+d
";
        let transcript = summarize_multi_file_diff(diff).unwrap();
        assert!(transcript.contains("-  40 | c"));
        assert!(transcript.contains("+  42 | d"));
    }

    #[test]
    fn deleted_file_without_new_path_is_not_emitted() {
        let diff = "\
diff --git a/Gone.java b/Gone.java
deleted file mode 100644
--- a/Gone.java
+++ /dev/null
@@ -1,1 +0,0 @@
-class Gone {}
";
        assert_eq!(summarize_multi_file_diff(diff).unwrap(), "");
    }

    #[test]
    fn change_before_hunk_header_is_an_error() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ malformed @@
+added
";
        let err = summarize_multi_file_diff(diff).unwrap_err();
        assert!(matches!(err, ReviewError::Diff(_)));
        assert!(err.to_string().contains("A.java"));
    }

    #[test]
    fn counters_do_not_leak_into_next_file() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ -1,1 +1,1 @@
 same
diff --git a/B.java b/B.java
--- a/B.java
+++ b/B.java
+orphan
";
        assert!(summarize_multi_file_diff(diff).is_err());
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let diff = "\
diff --git a/A.java b/A.java
--- a/A.java
+++ b/A.java
@@ -1 +1 @@
-x
\\ No newline at end of file
+y
";
        let transcript = summarize_multi_file_diff(diff).unwrap();
        assert!(transcript.contains("-   1 | x"));
        assert!(transcript.contains("+   1 | y"));
        assert!(!transcript.contains("No newline"));
    }

    #[test]
    fn blank_new_path_is_not_emitted() {
        let diff = "diff --git a/ b/\n--- a/x\n+++ b/   \n@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(summarize_multi_file_diff(diff).unwrap(), "");
    }

    #[test]
    fn line_number_overflow_is_an_error() {
        let diff = format!(
            "diff --git a/A.java b/A.java\n--- a/A.java\n+++ b/A.java\n@@ -{max} +{max} @@\n-a\n",
            max = usize::MAX
        );
        let err = summarize_multi_file_diff(&diff).unwrap_err();
        assert!(matches!(err, ReviewError::Diff(ref msg) if msg.contains("overflow")));
    }
}
