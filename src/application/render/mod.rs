pub mod convert;
pub mod coordinator;
pub mod emitter;
pub mod types;

pub use convert::{AsciidoctorCli, ConversionEngine, ConvertError};
pub use coordinator::{JobOutcome, RenderCoordinator, RenderJob, WaitBudgets};
pub use types::{Backend, DocumentAttributes, LayoutToggles, PassOrder, RenderMode, RenderRequest};
