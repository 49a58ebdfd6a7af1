//! Application services layer scaffolding.

pub mod announcements;
pub mod conferences;
pub mod error;
pub mod jobs;
pub mod profile;
pub mod query;
pub mod registration;
pub mod repos;
pub mod sessions;
pub mod speakers;
