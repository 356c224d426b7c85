//! # keystone-common
//!
//! Shared types, configuration, error handling, and validation used across all
//! Keystone crates. No remote calls here, just the declarative model and its
//! contracts.

pub mod blueprint;
pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod validation;
