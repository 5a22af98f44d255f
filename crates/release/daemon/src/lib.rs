//! Release daemon library
//!
//! This module provides the components of the release daemon:
//! - REST API handlers over the release engine
//! - Layered configuration
//! - Fixture seeding for the in-memory collaborators
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use fixtures::Fixtures;
pub use server::Server;
