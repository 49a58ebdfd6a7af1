//! Core domain model: entities and shared enums.

pub mod entities;
pub mod types;
