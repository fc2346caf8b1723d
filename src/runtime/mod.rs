//! Scheduler Runtime
//!
//! The cooperative scheduling loop, its task registry, and the bus
//! diagnostics responder ([`Doctor`]).
//!
//! # Overview
//!
//! A [`Scheduler`] owns three pieces of state:
//! - the task registry (periodic callbacks with a minimum interval)
//! - the subscription registry of the message bus
//! - the bounded message queue
//!
//! Every call to [`Scheduler::run_once`] drains the queue, then gives each task
//! one chance to run. There is no preemption: a callback runs until it returns.
//!
//! # Reentrancy
//!
//! Task and subscription callbacks receive `&mut Scheduler`. While a callback
//! runs it is moved out of its registry entry, and the loop walks entries by
//! id instead of index, so callbacks may publish, subscribe, unsubscribe, add
//! or remove tasks (themselves included) without disturbing the pass.
//!
//! # Priorities
//!
//! Each task carries a [`Priority`] tag. With the default
//! [`RunStrategy::Registration`](crate::RunStrategy) it is not consulted and
//! tasks run in registration order. [`RunStrategy::Priority`](crate::RunStrategy)
//! opts into visiting the most urgent levels first.

pub(crate) mod doctor;
pub(crate) mod scheduler;
pub(crate) mod tasks;
pub(crate) mod traits;

pub use doctor::Doctor;
pub use scheduler::{Scheduler, SubscriberFn, TaskFn};
pub use tasks::{DEFAULT_INTERVAL, Priority, TaskId, TaskInfo, TaskRegistry};
pub use traits::{NoopPlatform, Platform};
