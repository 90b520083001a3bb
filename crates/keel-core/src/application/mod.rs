//! # Keel Application Registry
//!
//! The cache-or-compute facade the kernels read their manifest from. Reads
//! prefer a cached artifact and fall back to aggregating the configured
//! plugins; only the explicit maintenance operations write or delete cache
//! files.
pub mod registry;

pub use registry::ApplicationRegistry;
