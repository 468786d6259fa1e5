//! Testing infrastructure for specboard.
//!
//! - **Mocks**: [`MockGitOperations`] serves canned git output through the
//!   [`GitOperations`](crate::git::GitOperations) trait
//! - **Fixtures**: temporary project trees for each board format (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use specboard::testing::{MockGitOperations, TestFixture};
//!
//! let git = MockGitOperations::new()
//!     .with_commit("abc1234", "[WP01] parser", "2024-01-01T00:00:00Z", "alice");
//!
//! let fixture = TestFixture::new().with_directory_board("001-auth");
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
