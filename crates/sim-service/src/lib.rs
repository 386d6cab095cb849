//! Facade composing the durable store, the adapter registry, and the
//! experiment-planning engine into the API a transport layer would call.
//!
//! No HTTP server lives here; `SimulationService`'s methods are exactly the
//! operations such a layer would dispatch to.

mod config;
mod service;
mod views;

pub use config::ServiceConfig;
pub use service::SimulationService;
pub use views::{BackendHealth, JobView, PurgeReport, ServiceSummary};
