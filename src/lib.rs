//! Confero: a conference-management API service.
//!
//! Layered layout: `domain` holds entities and core types, `application`
//! holds services and repository traits, `infra` holds the Postgres,
//! HTTP, cache, and telemetry adapters, and `config` resolves settings.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
