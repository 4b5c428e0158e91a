//! HTTP handlers for entity CRUD and model metadata.

pub mod entity;
pub mod meta;
pub use entity::*;
pub use meta::*;
