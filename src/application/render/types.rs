use serde::{Deserialize, Serialize};

use crate::domain::build::{DocsFormat, TocPlacement};

/// Target output format for one conversion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Html5,
    Pdf,
}

impl Backend {
    /// Backend name understood by asciidoctor-style converters.
    pub fn converter_name(self) -> &'static str {
        match self {
            Backend::Html5 => "html5",
            Backend::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Backend::Html5 => "html",
            Backend::Pdf => "pdf",
        }
    }

    /// Capability toggle for the pass: the two backends do not support
    /// the same markup-processing extensions, and mixing them corrupts
    /// PDF output.
    pub fn render_mode(self) -> RenderMode {
        match self {
            Backend::Html5 => RenderMode::HtmlWithExtensions,
            Backend::Pdf => RenderMode::PdfWithoutExtensions,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.converter_name())
    }
}

/// Extension capability selected once per pass, never mutated mid-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    HtmlWithExtensions,
    PdfWithoutExtensions,
}

impl RenderMode {
    pub fn extensions_enabled(self) -> bool {
        matches!(self, RenderMode::HtmlWithExtensions)
    }
}

/// Which backend converts first when a job produces both formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassOrder {
    #[default]
    HtmlFirst,
    PdfFirst,
}

impl PassOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            PassOrder::HtmlFirst => "html-first",
            PassOrder::PdfFirst => "pdf-first",
        }
    }
}

/// Layout-visibility flags controlling which sections the emitter writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutToggles {
    pub hide_features_section: bool,
    pub hide_summary: bool,
    pub hide_scenario_keyword: bool,
    pub hide_step_time: bool,
    pub hide_tags: bool,
}

/// A fully-specified rendering request. Immutable once rendering starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub format: DocsFormat,
    pub title: String,
    pub toc: TocPlacement,
    pub numbered: bool,
    pub sect_anchors: bool,
    pub layout: LayoutToggles,
}

impl RenderRequest {
    /// Defaults matching the publisher's historical behaviour: HTML only,
    /// right-hand toc, numbered sections with anchors.
    pub fn new(format: DocsFormat) -> Self {
        Self {
            format,
            title: "Living Documentation".to_string(),
            toc: TocPlacement::Right,
            numbered: true,
            sect_anchors: true,
            layout: LayoutToggles::default(),
        }
    }

    /// The backend passes this request requires, in execution order.
    pub fn backends(&self, order: PassOrder) -> Vec<Backend> {
        match self.format {
            DocsFormat::Html => vec![Backend::Html5],
            DocsFormat::Pdf => vec![Backend::Pdf],
            DocsFormat::All => match order {
                PassOrder::HtmlFirst => vec![Backend::Html5, Backend::Pdf],
                PassOrder::PdfFirst => vec![Backend::Pdf, Backend::Html5],
            },
        }
    }

    pub fn attributes_for(&self, backend: Backend) -> DocumentAttributes {
        DocumentAttributes {
            backend,
            title: self.title.clone(),
            toc: self.toc,
            numbered: self.numbered,
            sect_anchors: self.sect_anchors,
            layout: self.layout,
        }
    }
}

/// Attribute set for one conversion pass; carried explicitly through the
/// emitter and the converter instead of process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAttributes {
    pub backend: Backend,
    pub title: String,
    pub toc: TocPlacement,
    pub numbered: bool,
    pub sect_anchors: bool,
    pub layout: LayoutToggles,
}

impl DocumentAttributes {
    /// Attribute pairs handed to the converter CLI as `-a key=value`
    /// (or bare `-a key` for boolean switches).
    pub fn converter_attributes(&self) -> Vec<String> {
        let mut attrs = vec![format!("toc={}", self.toc.as_str())];
        if self.numbered {
            attrs.push("numbered".to_string());
        }
        if self.sect_anchors {
            attrs.push("sectanchors".to_string());
        }
        attrs.push(format!("doctitle={}", self.title));
        attrs
    }
}
