//! # Cooperative Scheduler for Embedded Systems
//!
//! `myrtio-sched` is a single-threaded, cooperative task scheduler with an
//! in-process, MQTT-style publish/subscribe bus. It targets small devices
//! that cannot afford threads or an operating system scheduler.
//!
//! ## Core Features
//!
//! - **`no_std`:** Runs on bare metal with an allocator. Registries grow on
//!   demand under an explicit [`Capacity`] policy and report exhaustion
//!   instead of aborting.
//! - **Periodic tasks:** Each task declares a minimum interval. Tasks run to
//!   completion in registration order; lateness is tracked per task.
//! - **Message bus:** `publish` queues a message; subscriptions use the MQTT
//!   wildcards `+` (one level) and `#` (all remaining levels).
//! - **Reentrant:** Callbacks receive `&mut Scheduler` and may publish,
//!   subscribe, or add and remove tasks while the loop is running.
//! - **Platform agnostic:** Time comes from a [`Clock`]; watchdog and yield
//!   hooks come from a [`Platform`].
//! - **Helpers:** [`Timeout`] and [`Heartbeat`] for periodic work,
//!   [`SensorProcessor`] for smoothing readings, and a [`Doctor`] that answers
//!   diagnostics requests on the bus.
//!
//! ## Usage
//!
//! ```ignore
//! use myrtio_sched::{NoopPlatform, Scheduler, SchedulerConfig};
//! use embassy_time::Duration;
//!
//! let mut sched = Scheduler::new(clock, NoopPlatform, SchedulerConfig::default());
//!
//! sched.subscribe("sensors/+/temp", |_, topic, payload| {
//!     // handle reading
//! })?;
//!
//! sched.add(Duration::from_millis(500), |s| {
//!     let _ = s.publish("sensors/kitchen/temp", "21.5");
//! })?;
//!
//! loop {
//!     sched.run_once();
//! }
//! ```
//!
//! ## Logging
//!
//! Enable the `log` or `defmt` feature to get diagnostics for dropped
//! messages, exhausted capacity and registry changes.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// Must come first so the logging macros are in scope for every module.
#[macro_use]
mod fmt;

pub mod bus;
pub mod config;
pub mod error;
pub mod runtime;
pub mod sensor;
pub mod time;
pub mod topic;
pub mod util;

// Re-export key types for easier access at the crate root.
pub use bus::{Message, SubscriptionHandle};
pub use config::{Capacity, RunStrategy, SchedulerConfig};
pub use error::SchedulerError;
pub use runtime::{
    DEFAULT_INTERVAL, Doctor, NoopPlatform, Platform, Priority, Scheduler, TaskId, TaskInfo,
};
pub use sensor::SensorProcessor;
pub use time::{Clock, Heartbeat, ManualClock, Timeout};
pub use topic::matches;
