//! In-process message bus.
//!
//! Messages are published to `/`-separated topics and queued in a bounded
//! FIFO. They are matched against subscriptions only when the scheduler
//! drains the queue, so a subscription created after a publish but before
//! the drain still receives the message.

pub(crate) mod queue;
pub(crate) mod registry;

pub use queue::{Message, MessageQueue};
pub use registry::{SubscriptionHandle, SubscriptionRegistry};
