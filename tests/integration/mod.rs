//! Integration tests
//!
//! End-to-end offline flows against the in-memory service, and the HTTP
//! client against a mock server.

mod library_test;
mod reader_test;
mod reconciler_test;
