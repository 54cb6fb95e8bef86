//! Layer 1: Effect trait definitions.
//!
//! These traits describe **what** the tonbag core needs from the outside
//! world; handlers in `tonbag-effects` (production) and `tonbag-testkit`
//! (mocks) describe **how**.
//!
//! # Effect Classification
//!
//! - **Backend**: contract reads, provider pricing and payload building,
//!   served by the storage daemon
//! - **Wallet**: transaction signing, served by the user's wallet
//! - **Storage**: namespaced key-value persistence
//! - **Time**: wall-clock seconds for expiry and validity windows
//!
//! All traits are `async_trait` and `Send + Sync` so handlers can be shared
//! behind `Arc` across workflows.

pub mod backend;
pub mod storage;
pub mod time;
pub mod wallet;

pub use backend::{BackendEffects, BackendError};
pub use storage::{StorageEffects, StorageError};
pub use time::PhysicalTimeEffects;
pub use wallet::{WalletEffects, WalletError};
