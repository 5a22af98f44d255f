//! Batch Release Domain Types
//!
//! A processed lot (dried, cured, trimmed or packaged) may only leave the
//! facility after it has passed an ordered set of quality-control
//! checkpoints and collected every role-gated approval. This crate holds the
//! vocabulary of that workflow; the state machine lives in `release-engine`.
//!
//! # Key Concepts
//!
//! - **ReleaseTemplate**: the reusable, immutable shape of a release for a
//!   product type (ordered checkpoint specs, ordered approval specs).
//! - **ProcessingBatch**: the finished processing record a release consumes.
//!   Owned by the processing ledger, read-only here.
//! - **BatchRelease**: the aggregate. Owns its checkpoint results and
//!   approvals; its status is derived from them.
//! - **AuditEntry**: one immutable, hash-linked record per accepted mutation.
//!
//! # Design Principles
//!
//! 1. Release status is computed, never assigned (apart from hold/reject).
//! 2. Every accepted mutation produces exactly one audit entry.
//! 3. Request commands name exactly the fields a caller may set.

#![deny(unsafe_code)]

mod audit;
mod batch;
mod document;
mod errors;
mod ids;
mod query;
mod release;
mod requests;
mod status;
mod template;

pub use audit::*;
pub use batch::*;
pub use document::*;
pub use errors::*;
pub use ids::*;
pub use query::*;
pub use release::*;
pub use requests::*;
pub use status::*;
pub use template::*;
