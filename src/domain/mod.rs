//! Domain types: build identity, output formats, and the artifact layout.

pub mod build;
pub mod layout;
