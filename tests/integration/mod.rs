//! Integration test suite for repograph
//!
//! End-to-end tests that resolve descriptor repositories written to temporary
//! directories, through the library API and through the `repograph` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: Full resolution runs against file-backed repositories
//! - **cli**: `repograph resolve` and `repograph classpath` behavior

mod cli;
mod resolution;
