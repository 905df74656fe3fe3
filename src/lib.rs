//! CI compile action for embedded firmware.
//!
//! Resolves a Device OS version against the remote build target
//! catalog, decides via git history whether the product's embedded
//! version macro needs incrementing, and drives a local (container)
//! or remote (cloud) compilation.

pub mod action;
pub mod autoversion;
pub mod catalog;
pub mod cloud;
pub mod docker;
pub mod error;
pub mod platform;
pub mod repo;
pub mod resolver;
pub mod sources;

pub use error::{ActionError, Result};
