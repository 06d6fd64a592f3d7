//! tern Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all tern workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Capacities, segment geometry and default paths
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! tern = { package = "tern_common", path = "../tern_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use tern_common::consts::*;
//! use tern_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
