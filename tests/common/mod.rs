//! Common test utilities for ncgrid.
//!
//! Shared fixtures, float assertions and HTTP helpers for the integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod http_client;
pub mod test_data;
