//! Release storage abstractions.
//!
//! This crate defines the persistence contract of the batch release engine:
//! - release aggregates, versioned for optimistic concurrency
//! - per-release append-only audit chains
//!
//! Design stance:
//! - A release snapshot and the audit entry describing its mutation are
//!   committed as one unit; there is no way to write either alone.
//! - The in-memory adapter is the reference implementation used by tests and
//!   the demo daemon.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryReleaseStore;
pub use traits::{AuditStore, QueryWindow, ReleaseCommit, ReleaseRepository, ReleaseStore};
