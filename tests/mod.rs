//! Test suite for Offline Reader
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
pub mod property;
