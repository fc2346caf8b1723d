//! # Scheduler Configuration
//!
//! Sizing and run-order options for a [`Scheduler`](crate::Scheduler).
//! Defaults match a tiny device: room for two tasks, two queued messages and
//! two subscriptions, growing on demand.

/// Growth policy for a registry's backing storage.
///
/// Storage starts with `initial` slots and doubles whenever it is full, but
/// never beyond `limit`. Growth is fallible: when the allocator refuses,
/// the registration fails instead of aborting the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capacity {
    /// Slots reserved up front.
    pub initial: usize,
    /// Hard upper bound on the number of entries, `None` for no bound.
    pub limit: Option<usize>,
}

impl Capacity {
    /// Start with `initial` slots and grow without an explicit bound.
    pub const fn growable(initial: usize) -> Self {
        Self {
            initial,
            limit: None,
        }
    }

    /// Start with `initial` slots and grow up to `limit` entries.
    pub const fn bounded(initial: usize, limit: usize) -> Self {
        Self {
            initial,
            limit: Some(limit),
        }
    }

    /// Reserve exactly `slots` and never grow.
    pub const fn fixed(slots: usize) -> Self {
        Self::bounded(slots, slots)
    }

    /// Maximum number of entries this policy admits.
    pub fn max_entries(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::growable(2)
    }
}

/// Order in which a pass visits the registered tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunStrategy {
    /// Registration order. Task priorities are recorded but not consulted.
    #[default]
    Registration,
    /// Most urgent priority level first, registration order within a level.
    /// Every task is still visited once per pass; nothing is preempted.
    Priority,
}

/// Options for constructing a [`Scheduler`](crate::Scheduler).
///
/// ```ignore
/// let config = SchedulerConfig::default()
///     .with_tasks(Capacity::bounded(4, 16))
///     .with_queue_depth(8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tasks: Capacity,
    /// Maximum number of messages waiting for dispatch. The queue never grows.
    pub queue_depth: usize,
    pub subscriptions: Capacity,
    pub run_strategy: RunStrategy,
}

impl SchedulerConfig {
    pub fn with_tasks(mut self, tasks: Capacity) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn with_subscriptions(mut self, subscriptions: Capacity) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_run_strategy(mut self, run_strategy: RunStrategy) -> Self {
        self.run_strategy = run_strategy;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tasks: Capacity::default(),
            queue_depth: 2,
            subscriptions: Capacity::default(),
            run_strategy: RunStrategy::Registration,
        }
    }
}
