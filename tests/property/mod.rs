//! Property-based tests
//!
//! Uses proptest to generate random inputs and verify properties

mod pagination_proptest;
