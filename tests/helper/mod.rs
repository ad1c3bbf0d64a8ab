//! Shared fixtures for integration tests

#![allow(dead_code)]

pub mod feed;
pub mod project;

pub use feed::*;
pub use project::*;
