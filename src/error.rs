//! # Error Types
//!
//! This module defines the error type shared by the scheduler, the message queue
//! and the registries. Every failure is reported synchronously to the caller;
//! nothing is retried and the scheduler keeps running on the next pass.

use core::fmt;

/// The error enum for scheduler and bus operations.
///
/// Lookups that can only fail because an entry is unknown (`remove`,
/// `unsubscribe`) report `false` instead of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// The message queue is at capacity. The message was dropped.
    QueueFull,
    /// A registry reached its capacity limit, the allocator refused to grow
    /// a registry or copy a string, or an id space is used up.
    CapacityExhausted,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::QueueFull => f.write_str("message queue is full"),
            SchedulerError::CapacityExhausted => f.write_str("registry capacity exhausted"),
        }
    }
}

impl core::error::Error for SchedulerError {}
