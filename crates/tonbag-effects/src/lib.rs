//! # tonbag-effects - Layer 3: Production Handlers
//!
//! **Purpose**: Stateless and in-process implementations of the effect
//! interfaces declared in `tonbag-core`, plus the typed event bus that
//! decouples the application workflows from each other.
//!
//! # Architecture Constraints
//!
//! - YES production handlers (filesystem, system clock)
//! - YES the in-process [`EventBus`]
//! - NO mock handlers (those live in `tonbag-testkit`)
//! - NO workflow logic (that is `tonbag-app`)

#![forbid(unsafe_code)]

pub mod bus;
pub mod storage;
pub mod time;

pub use bus::{EventBus, Subscription, Topic, TopicStream};
pub use storage::FilesystemStorageHandler;
pub use time::SystemClockHandler;
