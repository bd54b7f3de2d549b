//! Domain models for Doorstop publishing.
//!
//! This module contains the asset catalog, project configuration, and the
//! single-document HTML transformer.

/// Static assets and branding strings injected into published pages.
pub mod assets;
pub use assets::{AssetCatalog, Branding};

mod config;
pub use config::{Config, ConfigError};

/// Idempotent rewriting of a single Doorstop HTML document.
pub mod transform;
pub use transform::{Transformer, transform};
