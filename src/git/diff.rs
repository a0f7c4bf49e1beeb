use serde::Serialize;

/// Which two trees a diff compares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffScope {
    /// Working tree against the index
    #[default]
    Default,
    /// Index against HEAD
    Staged,
    /// Working tree against HEAD
    Head,
}

impl DiffScope {
    /// Map a request parameter to a scope; unknown or missing values use [`DiffScope::Default`]
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("staged") | Some("cached") => DiffScope::Staged,
            Some("head") => DiffScope::Head,
            _ => DiffScope::Default,
        }
    }

    /// Arguments after `diff` selecting this scope
    pub fn args(self) -> &'static [&'static str] {
        match self {
            DiffScope::Default => &[],
            DiffScope::Staged => &["--staged"],
            DiffScope::Head => &["HEAD"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Added,
    Removed,
    Header,
    Context,
}

/// One line of diff output and how to render it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// Line as git printed it, including its terminator
    pub raw: String,
    pub kind: DiffLineKind,
}

/// Classify a single diff line
pub fn classify_line(line: &str) -> DiffLineKind {
    if line.starts_with('+') && !line.starts_with("+++") {
        DiffLineKind::Added
    } else if line.starts_with('-') && !line.starts_with("---") {
        DiffLineKind::Removed
    } else if line.starts_with("@@") || line.starts_with("diff") {
        DiffLineKind::Header
    } else {
        DiffLineKind::Context
    }
}

/// Tag every line of `diff` without altering it
pub fn classify(diff: &str) -> Vec<DiffLine> {
    diff.split_inclusive('\n')
        .map(|raw| DiffLine {
            raw: raw.to_string(),
            kind: classify_line(raw),
        })
        .collect()
}

/// A computed diff: git's raw text plus its classified lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffView {
    pub scope: DiffScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub text: String,
    pub lines: Vec<DiffLine>,
}

impl DiffView {
    pub fn new(scope: DiffScope, path: Option<String>, text: String) -> Self {
        let lines = classify(&text);
        Self {
            scope,
            path,
            text,
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "diff --git a/src/lib.rs b/src/lib.rs\n",
        "index 3b18e51..a9c2f1d 100644\n",
        "--- a/src/lib.rs\n",
        "+++ b/src/lib.rs\n",
        "@@ -1,3 +1,3 @@\n",
        " pub mod error;\n",
        "-pub mod old;\n",
        "+pub mod new;\n",
    );

    fn kinds(diff: &str) -> Vec<DiffLineKind> {
        classify(diff).into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_classify_sample() {
        use DiffLineKind::*;
        assert_eq!(
            kinds(SAMPLE),
            vec![Header, Context, Context, Context, Header, Context, Removed, Added]
        );
    }

    #[test]
    fn test_file_markers_are_not_changes() {
        assert_eq!(classify_line("+++ b/file"), DiffLineKind::Context);
        assert_eq!(classify_line("--- a/file"), DiffLineKind::Context);
        assert_eq!(classify_line("++x"), DiffLineKind::Added);
        assert_eq!(classify_line("--x"), DiffLineKind::Removed);
    }

    #[test]
    fn test_diff_word_prefix_is_header() {
        assert_eq!(classify_line("diff --cc file"), DiffLineKind::Header);
        assert_eq!(classify_line("@@@ -1 -1 +1 @@@"), DiffLineKind::Header);
    }

    #[test]
    fn test_classification_is_non_destructive() {
        for input in [SAMPLE, "", "no newline", "a\r\nb\n\n+c", "\n\n"] {
            let rebuilt: String = classify(input).iter().map(|l| l.raw.as_str()).collect();
            assert_eq!(rebuilt, input);
        }
    }

    #[test]
    fn test_empty_diff_has_no_lines() {
        assert!(classify("").is_empty());
        assert!(DiffView::new(DiffScope::Default, None, String::new()).is_empty());
    }

    #[test]
    fn test_raw_keeps_terminator() {
        let lines = classify("+added\r\n-removed\nlast");
        assert_eq!(lines[0].raw, "+added\r\n");
        assert_eq!(lines[1].raw, "-removed\n");
        assert_eq!(lines[2].raw, "last");
    }

    #[test]
    fn test_scope_from_param() {
        assert_eq!(DiffScope::from_param(Some("staged")), DiffScope::Staged);
        assert_eq!(DiffScope::from_param(Some("head")), DiffScope::Head);
        assert_eq!(DiffScope::from_param(Some("default")), DiffScope::Default);
        assert_eq!(DiffScope::from_param(Some("bogus")), DiffScope::Default);
        assert_eq!(DiffScope::from_param(None), DiffScope::Default);
    }

    #[test]
    fn test_scope_args() {
        assert!(DiffScope::Default.args().is_empty());
        assert_eq!(DiffScope::Staged.args(), ["--staged"]);
        assert_eq!(DiffScope::Head.args(), ["HEAD"]);
    }
}
