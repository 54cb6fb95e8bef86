//! tonbag Testing Infrastructure
//!
//! Mock effect handlers with scripted responses and call recording,
//! deterministic fixtures, and proptest strategies shared by the test
//! suites of every tonbag crate.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tonbag-testkit = { path = "../tonbag-testkit" }
//! ```
//!
//! ```rust,ignore
//! use tonbag_testkit::{fixtures, MockBackend};
//!
//! let backend = MockBackend::new();
//! backend.set_contract(&fixtures::content_key(1), fixtures::deployed(vec![fixtures::remote(1, "active")]));
//! ```

pub mod fixtures;
pub mod mocks;
pub mod strategies;

pub use mocks::{FixedClock, MemoryStorageHandler, MockBackend, MockWallet, SubmissionCall};
