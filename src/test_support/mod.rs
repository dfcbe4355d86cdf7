//! Test utilities for purser unit tests.
//!
//! Only compiled for tests. Provides builders for throwaway workspaces on
//! disk and a few canned manifests.
//!
//! # Example
//!
//! ```rust,ignore
//! use purser::test_support::WorkspaceFixture;
//!
//! let ws = WorkspaceFixture::new(r#"{"name": "root", "version": "1.0.0"}"#)
//!     .package("a", r#"{"name": "@test/a"}"#)
//!     .file("packages/a/index.js", "require('lodash');")
//!     .build();
//! ```

pub mod fixtures;

pub use fixtures::*;
