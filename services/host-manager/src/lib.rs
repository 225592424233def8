//! berth host manager library.
//!
//! The host manager owns host availability: which hosts are UP, which are
//! DRAINING ahead of maintenance and which are DOWN. It coordinates with the
//! orchestration backend (the operator API of the cluster master) to post
//! maintenance windows, and notifies the rescheduling side through the
//! maintenance queue when hosts start draining.
//!
//! This crate ships the `host-manager` binary and exposes the library surface
//! for integration testing and reuse.
//!
//! ## Modules
//!
//! - `registry`: shared DRAINING/DOWN host registry
//! - `agents`: snapshot of agents currently registered with the master
//! - `backend`: orchestration backend trait, operator HTTP client, in-memory backend
//! - `queue`: maintenance notification queue
//! - `service`: maintenance lifecycle and host queries
//! - `eligibility`: placement eligibility filter over the constraint evaluator
//! - `sync`: background agent/maintenance state refresh

pub mod agents;
pub mod api;
pub mod backend;
pub mod config;
pub mod eligibility;
pub mod host;
pub mod queue;
pub mod registry;
pub mod service;
pub mod state;
pub mod sync;

pub use host::{HostInfo, HostState};
pub use service::{HostService, HostServiceError};
