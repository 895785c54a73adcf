//! One-shot migration of the HOBBES hydrological network into Hydra.
//!
//! The pipeline is strictly sequential: fetch the feed, infer and upload a
//! template (or reuse one by ID), assemble and submit the network, then
//! build and submit a scenario. One XML result document on stdout is the
//! only outcome channel; nothing is rolled back on failure.

pub mod cli;
pub mod config;
pub mod error;
pub mod hobbes;
pub mod hydra;
pub mod importer;
pub mod report;
pub mod template;
pub mod xml;

// Re-exports for convenience
pub use error::{ImportError, ImportResult};
pub use importer::HobbesImporter;
