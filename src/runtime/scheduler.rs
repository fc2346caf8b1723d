//! The scheduler loop.

use alloc::boxed::Box;

use embassy_time::Duration;

use super::tasks::{DEFAULT_INTERVAL, Priority, TaskId, TaskInfo, TaskRegistry};
use super::traits::{NoopPlatform, Platform};
use crate::bus::{Message, MessageQueue, SubscriptionHandle, SubscriptionRegistry};
use crate::config::{Capacity, RunStrategy, SchedulerConfig};
use crate::error::SchedulerError;
use crate::time::{Clock, elapsed_since};

/// A periodic task. It receives the scheduler so it can publish, subscribe,
/// or add and remove tasks while it runs.
pub type TaskFn<C, P> = Box<dyn FnMut(&mut Scheduler<C, P>)>;

/// A subscription callback, invoked with `(scheduler, topic, payload)`.
pub type SubscriberFn<C, P> = Box<dyn FnMut(&mut Scheduler<C, P>, &str, &str)>;

/// Cooperative scheduler with an in-process publish/subscribe bus.
///
/// The host calls [`run_once`](Self::run_once) from its main loop. Each pass
/// dispatches all queued messages, then visits every task once, running those
/// whose minimum interval has elapsed. The queue is drained again before every
/// task so messages published by one task reach subscribers before the next
/// task runs.
///
/// Callbacks run to completion on the caller's thread and receive
/// `&mut Scheduler`, so they may freely call any method on it, including
/// removing themselves.
///
/// # Example
///
/// ```ignore
/// let mut sched = Scheduler::new(clock, NoopPlatform, SchedulerConfig::default());
///
/// sched.subscribe("sensors/+/temp", |_, topic, payload| {
///     info!("{} = {}", topic, payload);
/// })?;
///
/// sched.add(Duration::from_secs(1), |s| {
///     let _ = s.publish("sensors/kitchen/temp", "21.5");
/// })?;
///
/// loop {
///     sched.run_once();
/// }
/// ```
pub struct Scheduler<C: Clock, P: Platform = NoopPlatform> {
    clock: C,
    platform: P,
    tasks: TaskRegistry<TaskFn<C, P>>,
    subscriptions: SubscriptionRegistry<SubscriberFn<C, P>>,
    queue: MessageQueue,
    run_strategy: RunStrategy,
    started: u64,
    passes: u64,
}

impl<C: Clock, P: Platform> Scheduler<C, P> {
    /// Create a scheduler and arm the platform watchdog.
    pub fn new(clock: C, mut platform: P, config: SchedulerConfig) -> Self {
        platform.arm_watchdog();
        debug!(
            "scheduler up: {} task slots, queue depth {}, {} subscription slots",
            config.tasks.initial,
            config.queue_depth,
            config.subscriptions.initial
        );
        let started = clock.now();
        Self {
            clock,
            platform,
            tasks: TaskRegistry::new(config.tasks),
            subscriptions: SubscriptionRegistry::new(config.subscriptions),
            queue: MessageQueue::new(config.queue_depth),
            run_strategy: config.run_strategy,
            started,
            passes: 0,
        }
    }

    /// Create a scheduler from plain size hints. Task and subscription
    /// storage grows on demand; the queue is fixed at `queue_depth`.
    pub fn with_capacity(
        clock: C,
        platform: P,
        task_capacity: usize,
        queue_depth: usize,
        subscription_capacity: usize,
    ) -> Self {
        let config = SchedulerConfig::default()
            .with_tasks(Capacity::growable(task_capacity))
            .with_queue_depth(queue_depth)
            .with_subscriptions(Capacity::growable(subscription_capacity));
        Self::new(clock, platform, config)
    }

    /// Register a task with [`Priority::Normal`] that runs at most once per
    /// `interval`.
    ///
    /// Pass [`DEFAULT_INTERVAL`] when there is no particular cadence.
    pub fn add(
        &mut self,
        interval: Duration,
        task: impl FnMut(&mut Self) + 'static,
    ) -> Result<TaskId, SchedulerError> {
        self.add_with_priority(interval, Priority::Normal, task)
    }

    /// Register a task with an explicit priority tag.
    pub fn add_with_priority(
        &mut self,
        interval: Duration,
        priority: Priority,
        task: impl FnMut(&mut Self) + 'static,
    ) -> Result<TaskId, SchedulerError> {
        match self.tasks.add(Box::new(task), interval, priority) {
            Ok(id) => {
                debug!("task {} added, interval {} us", id.get(), interval.as_micros());
                Ok(id)
            }
            Err(err) => {
                warn!("cannot add task: {} registered", self.tasks.len());
                Err(err)
            }
        }
    }

    /// Register a task with the default interval and priority.
    pub fn add_default(
        &mut self,
        task: impl FnMut(&mut Self) + 'static,
    ) -> Result<TaskId, SchedulerError> {
        self.add(DEFAULT_INTERVAL, task)
    }

    /// Remove a task. Returns `false` if `id` is unknown.
    ///
    /// A task may remove itself; the current invocation still completes.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let removed = self.tasks.remove(id);
        if removed {
            debug!("task {} removed", id.get());
        }
        removed
    }

    /// Subscribe to every topic matching `pattern` (`+` and `#` wildcards).
    pub fn subscribe(
        &mut self,
        pattern: &str,
        callback: impl FnMut(&mut Self, &str, &str) + 'static,
    ) -> Result<SubscriptionHandle, SchedulerError> {
        match self.subscriptions.subscribe(pattern, Box::new(callback)) {
            Ok(handle) => {
                debug!("subscription {} on {}", handle.get(), pattern);
                Ok(handle)
            }
            Err(err) => {
                warn!("cannot subscribe to {}", pattern);
                Err(err)
            }
        }
    }

    /// Cancel a subscription. Returns `false` if `handle` is unknown.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let removed = self.subscriptions.unsubscribe(handle);
        if removed {
            debug!("subscription {} removed", handle.get());
        }
        removed
    }

    /// Queue a message for dispatch on the next drain.
    ///
    /// Fails with [`SchedulerError::QueueFull`] if the queue is at capacity;
    /// the message is dropped and already queued messages are unaffected.
    pub fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SchedulerError> {
        self.queue.enqueue(topic, payload)
    }

    /// Advance the scheduler by one pass.
    pub fn run_once(&mut self) {
        self.drain_queue();

        if let Some(last) = self.tasks.last_issued() {
            match self.run_strategy {
                RunStrategy::Registration => self.sweep(last, None),
                RunStrategy::Priority => {
                    for level in Priority::ALL {
                        self.sweep(last, Some(level));
                    }
                }
            }
        }

        self.platform.watchdog_reset();
        self.passes = self.passes.wrapping_add(1);
        trace!("pass {} done", self.passes);
    }

    /// Visit every task registered up to `last` once, in registration order.
    ///
    /// The walk follows task ids rather than indices, so callbacks may add or
    /// remove tasks without invalidating it. Tasks added during the sweep
    /// have ids past `last` and wait for the next pass.
    fn sweep(&mut self, last: TaskId, level: Option<Priority>) {
        let mut cursor = None;
        while let Some(id) = self.tasks.next_after(cursor, last, level) {
            cursor = Some(id);
            self.drain_queue();
            self.run_task(id);
            self.platform.yield_now();
        }
    }

    fn run_task(&mut self, id: TaskId) {
        let now = self.clock.now();
        let Some((mut task, elapsed)) = self.tasks.take_if_due(id, now, C::WIDTH) else {
            return;
        };
        task(self);
        let finished = self.clock.now();
        if !self.tasks.complete(id, task, elapsed, finished) {
            trace!("task {} removed itself", id.get());
        }
    }

    /// Dispatch queued messages until the queue is empty, including messages
    /// published by subscribers along the way.
    fn drain_queue(&mut self) {
        while let Some(message) = self.queue.dequeue() {
            self.deliver(&message);
        }
    }

    /// Invoke every subscription matching `message`, in registration order.
    ///
    /// Subscriptions created while the message is being delivered do not see
    /// it; subscriptions removed before they are reached are skipped.
    fn deliver(&mut self, message: &Message) {
        let Some(last) = self.subscriptions.last_issued() else {
            return;
        };
        let mut cursor = None;
        while let Some(handle) = self.subscriptions.next_match(cursor, last, message.topic()) {
            cursor = Some(handle);
            let Some(mut callback) = self.subscriptions.take_callback(handle) else {
                continue;
            };
            callback(self, message.topic(), message.payload());
            self.subscriptions.restore_callback(handle, callback);
        }
    }

    /// Bookkeeping for a registered task.
    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.tasks.info(id)
    }

    /// Ids of all registered tasks, in registration order.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.ids()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Task slots currently allocated.
    pub fn task_capacity(&self) -> usize {
        self.tasks.capacity()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscription slots currently allocated.
    pub fn subscription_capacity(&self) -> usize {
        self.subscriptions.capacity()
    }

    /// Messages waiting for the next drain.
    pub fn pending_messages(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// The configuration this scheduler runs with.
    pub fn config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tasks: self.tasks.policy(),
            queue_depth: self.queue.depth(),
            subscriptions: self.subscriptions.policy(),
            run_strategy: self.run_strategy,
        }
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Time since construction, modulo the clock's counter period.
    pub fn uptime(&self) -> Duration {
        elapsed_since(&self.clock, self.started)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
