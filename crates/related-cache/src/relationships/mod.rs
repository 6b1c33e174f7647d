//! Relationships Module - relationship schema, edges and the per-episode registry

pub mod edge;
pub mod metadata;
pub mod registry;

pub use edge::*;
pub use metadata::*;
pub use registry::*;
