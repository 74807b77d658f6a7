mod docs;
mod middleware;
mod theme;

pub use docs::{DocsState, build_router};
