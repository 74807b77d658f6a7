use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which documentation formats a build publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocsFormat {
    Html,
    Pdf,
    All,
}

impl DocsFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocsFormat::Html => "html",
            DocsFormat::Pdf => "pdf",
            DocsFormat::All => "all",
        }
    }

    /// Whether generating this format involves the PDF toolchain, which
    /// is measured as markedly slower and gets the larger wait budget.
    pub fn touches_pdf(self) -> bool {
        matches!(self, DocsFormat::Pdf | DocsFormat::All)
    }
}

impl std::fmt::Display for DocsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table-of-contents placement passed through to the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocPlacement {
    Left,
    Right,
    Center,
}

impl TocPlacement {
    pub fn as_str(self) -> &'static str {
        match self {
            TocPlacement::Left => "left",
            TocPlacement::Right => "right",
            TocPlacement::Center => "center",
        }
    }
}

/// Immutable metadata persisted once per successful render, used later to
/// resolve documentation requests into artifact paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub format: DocsFormat,
    pub build_number: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub build_time: OffsetDateTime,
}

impl BuildRecord {
    pub fn new(format: DocsFormat, build_number: u32, build_time: OffsetDateTime) -> Self {
        Self {
            format,
            build_number,
            build_time,
        }
    }

    pub fn has_html_docs(&self) -> bool {
        matches!(self.format, DocsFormat::Html | DocsFormat::All)
    }

    pub fn has_pdf_docs(&self) -> bool {
        matches!(self.format, DocsFormat::Pdf | DocsFormat::All)
    }
}

/// Build-level outcome reported back to the invoking CI system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Unstable,
    Failure,
}

impl BuildOutcome {
    /// Process exit status handed to the host: 0 success, 1 failure,
    /// 2 unstable.
    pub fn exit_code(self) -> i32 {
        match self {
            BuildOutcome::Success => 0,
            BuildOutcome::Failure => 1,
            BuildOutcome::Unstable => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildOutcome::Success => "SUCCESS",
            BuildOutcome::Unstable => "UNSTABLE",
            BuildOutcome::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
