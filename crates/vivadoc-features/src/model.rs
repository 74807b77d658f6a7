use serde::{Deserialize, Serialize};

/// One parsed feature from a Cucumber result file. Input to rendering,
/// never mutated by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Feature {
    /// Scenarios to document, excluding background elements (their steps
    /// are setup detail, not behaviour the reader cares about).
    pub fn scenarios(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|element| !element.is_background())
    }

    pub fn has_scenarios(&self) -> bool {
        self.scenarios().next().is_some()
    }

    /// Anchor-friendly identifier derived from the feature id or name.
    pub fn anchor(&self) -> String {
        let source = self.id.as_deref().unwrap_or(&self.name);
        source
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect()
    }
}

/// A scenario, scenario outline expansion, or background within a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Element {
    pub fn is_background(&self) -> bool {
        self.element_type.as_deref() == Some("background")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub result: Option<StepResult>,
}

impl Step {
    pub fn status(&self) -> StepStatus {
        self.result
            .as_ref()
            .map(|result| result.status)
            .unwrap_or(StepStatus::Unknown)
    }

    /// Step duration in nanoseconds, as reported by the Cucumber runner.
    pub fn duration_nanos(&self) -> u64 {
        self.result
            .as_ref()
            .and_then(|result| result.duration)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StepStatus,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Pending,
    Undefined,
    Ambiguous,
    #[serde(other)]
    Unknown,
}

impl StepStatus {
    pub fn is_passed(self) -> bool {
        matches!(self, StepStatus::Passed)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, StepStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}
