//! spam-shield domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `schema`: Structured-output schema and verdict validation
//! - `usecases`: Session controller and rendering

pub mod model;
pub mod ports;
pub mod schema;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use schema::{SchemaDialect, VerdictSchema};
