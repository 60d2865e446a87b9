//! Core traits, settings, and module registry shared by the shelf crates.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::{Endpoint, ModuleRegistry};
