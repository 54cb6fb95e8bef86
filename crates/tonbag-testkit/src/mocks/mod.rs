//! Mock effect handlers.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for recorded state. Locks are released before
//! any scripted delay is awaited.

mod backend;
mod storage;
mod time;
mod wallet;

pub use backend::{MockBackend, SubmissionCall};
pub use storage::MemoryStorageHandler;
pub use time::FixedClock;
pub use wallet::MockWallet;
