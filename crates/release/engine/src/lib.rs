//! Batch Release Engine
//!
//! Drives a processed batch from "finished processing" to "released for
//! distribution": instantiate a release from a template, work through its
//! ordered checkpoints, collect role-gated approvals and finalize, with
//! every accepted mutation recorded in a hash-linked audit trail.
//!
//! # Architecture
//!
//! - **TemplateRegistry**: immutable, versioned release templates
//! - **ReleaseEngine**: the state machine and all mutating operations
//! - **state_machine**: guards and status settlement
//! - **AuditLog**: lazy, restartable access to per-release audit chains
//! - **stats**: on-demand aggregation over release snapshots
//! - **DocumentWorker**: asynchronous compliance document generation
//!
//! # Concurrency
//!
//! Mutations of one release serialize on a per-release lock; initiation
//! serializes on the processing batch. Collaborator lookups happen before
//! a lock is taken, and document rendering happens after it is released.

#![deny(unsafe_code)]

pub mod audit_log;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod documents;
pub mod engine;
pub mod ids;
pub mod locks;
pub mod state_machine;
pub mod stats;
pub mod template_registry;

pub use audit_log::{AuditLog, AuditTrail, ChainVerification};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{InMemoryProcessingLedger, ProcessingLedger, RoleDirectory, RoleProvider};
pub use config::EngineConfig;
pub use documents::{
    document_queue, DocumentGenerator, DocumentJob, DocumentQueue, DocumentWorker,
    InspectionSummaryGenerator, ReleaseCertificateGenerator,
};
pub use engine::ReleaseEngine;
pub use ids::{IdAllocator, IdSequence, ReleaseNumberFormatter};
pub use locks::LockTable;
pub use template_registry::TemplateRegistry;
