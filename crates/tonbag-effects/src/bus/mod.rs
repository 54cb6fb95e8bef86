//! Typed in-process event bus.
//!
//! Workflows talk to each other by publishing on [`Topic`]s. A topic fixes
//! its payload type at compile time, so a publisher and a subscriber cannot
//! disagree about what a channel carries. Every subscription is an owned
//! [`Subscription`] handle: dropping it unsubscribes, which makes a leaked
//! duplicate handler a visible ownership bug instead of a silent one.
//!
//! Delivery is synchronous and in publish order. The registry lock is
//! released before handlers run, so a handler may publish, subscribe or
//! dispose re-entrantly.

mod registry;
mod stream;
mod topic;

pub use registry::{EventBus, Subscription};
pub use stream::TopicStream;
pub use topic::Topic;
