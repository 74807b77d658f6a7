//! Application services: source location, rendering, and the publish flow.

pub mod error;
pub mod locator;
pub mod publish;
pub mod render;
