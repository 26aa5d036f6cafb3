//! Pressroom Common - Shared types and utilities
//!
//! This crate provides configuration, the error type, and the identifiers
//! and status enums shared by every Pressroom component.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
