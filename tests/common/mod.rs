//! Common test utilities and fixtures for jet integration tests
//!
//! - `TestRepo` builder for source trees with separate artifact and map roots
//! - `sample_repo` with two interdependent packages

#![allow(dead_code)]

pub mod test_repo;

pub use test_repo::{sample_repo, TestRepo};
