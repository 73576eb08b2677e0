//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-memory document service with scripted job responses
//! - Test environment fixtures rooted in a temporary directory
//! - Custom assertion macros
#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod mock_service;

// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_service::*;
