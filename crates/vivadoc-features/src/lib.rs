//! Cucumber feature-result model and discovery for vivadoc.
//!
//! CI runs drop `*.json` result files somewhere under the build workspace;
//! this crate finds them, deserializes the ones that look like Cucumber
//! output, and exposes a small read-only model plus per-feature run
//! statistics for the documentation emitter.

mod model;
mod parser;
mod summary;

pub use model::{Element, Feature, Step, StepResult, StepStatus, Tag};
pub use parser::find_and_parse;
pub use summary::{FeatureStats, totals};
