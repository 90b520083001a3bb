//! # Keel Plugin System
//!
//! Plugins are statically registered trait objects. Each declares the ids of
//! the extension points it contributes (service providers, console commands,
//! controllers, middleware and event listeners) and binds the objects behind
//! those ids into the container at bootstrap.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`traits`]**: the [`Plugin`] trait and the plugin-side [`PluginError`](traits::PluginError).
//! - **[`registry`]**: the [`PluginTable`] of known plugins and the
//!   [`PluginRegistry`], which merges declarations into an [`AggregatedManifest`].
//! - **[`manifest`]**: the merged manifest, its five [`ManifestKind`]s and the
//!   per-kind [`Artifact`](manifest::Artifact) the cache stores.
//! - **[`version`]**: API version and semver ranges for compatibility checks.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError).
pub mod error;
pub mod manifest;
pub mod registry;
pub mod traits;
pub mod version;

pub use manifest::{AggregatedManifest, Artifact, ManifestKind, PluginDeclarations};
pub use registry::{PluginRegistry, PluginTable};
pub use traits::{EventMap, Plugin, PluginError};
pub use version::{ApiVersion, VersionRange};
