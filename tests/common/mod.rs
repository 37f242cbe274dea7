//! Common test utilities and fixtures for wallmount integration tests
//!
//! This module provides:
//! - `TestSite` builder for a temporary store root with staged versions
//! - helpers for spinning up the HTTP server on an ephemeral port

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod test_site;

pub use test_site::{id, TestServer, TestSite};
