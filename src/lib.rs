//! Doorstop Publishing
//!
//! Post-processes the static HTML exported by Doorstop (CDN assets, dark
//! mode, accessibility, project branding) and exposes the `reqs-deps`,
//! `reqs-validate` and `reqs-publish` build targets.

pub mod domain;
pub use domain::{AssetCatalog, Branding, Config, ConfigError, Transformer, transform};

/// Filesystem traversal: HTML post-processing and document discovery.
pub mod storage;
pub use storage::{
    Documents, WalkError, WalkReport, discover_documents, postprocess_directory,
    postprocess_directory_with,
};

/// Build targets driving Doorstop.
pub mod targets;
pub use targets::{
    Action, ActionError, BuildEnvironment, Outcome, TargetError, TargetGraph, register_targets,
    register_targets_with_runner,
};
