//! # gvmkit-common
//!
//! Shared vocabulary of the workspace: the entity catalog, the error
//! taxonomy and configuration loading. Nothing in here performs I/O beyond
//! reading the environment.

pub mod config;
pub mod entities;
pub mod error;

pub use error::{GmpError, Result};
