//! Backend adapter contract and shared adapter plumbing.
//!
//! # Implementing a custom backend
//!
//! ```ignore
//! use sim_hal::{Adapter, AdapterRegistry};
//! use std::sync::Arc;
//!
//! let mut registry = AdapterRegistry::new();
//! registry.register(Arc::new(MyAdapter::default()));
//! ```
//!
//! Concrete adapters live in their own crates under `adapters/` (one per
//! backend); this crate only defines the contract, the registry, and the
//! subprocess-invocation and log-parsing helpers every adapter shares.

mod adapter;
mod invoke;
mod parsers;
mod registry;

pub use adapter::Adapter;
pub use invoke::{run_backend, to_wsl_path, RunOutcome, DEFAULT_TIMEOUT_SECS, LOG_TAIL_CHARS, WSL_DISTRO_ENV};
pub use parsers::{parse_cfd_metrics, parse_md_metrics};
pub use registry::AdapterRegistry;
