//! Task registry: periodic callbacks with a minimum interval.

use embassy_time::Duration;

use crate::config::Capacity;
use crate::error::SchedulerError;
use crate::time::time_diff;
use crate::util::Slots;

/// Interval used when the caller has no preference: 100 ms.
pub const DEFAULT_INTERVAL: Duration = Duration::from_micros(100_000);

/// Priority tag of a task.
///
/// Under the default [`RunStrategy::Registration`](crate::RunStrategy) this is
/// metadata only and never changes the order in which tasks run. Lower values
/// are more urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    SystemCritical = 0,
    TimeCritical = 1,
    High = 2,
    #[default]
    Normal = 3,
    Low = 4,
    Lowest = 5,
}

impl Priority {
    /// All levels, most urgent first.
    pub const ALL: [Priority; 6] = [
        Priority::SystemCritical,
        Priority::TimeCritical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Lowest,
    ];
}

/// Identifies a registered task for removal and introspection.
///
/// Ids start at 1, increase with every `add` and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(u32);

impl TaskId {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Snapshot of a task's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    pub priority: Priority,
    pub interval: Duration,
    /// Tick at which the last invocation returned, `0` before the first run.
    pub last_run: u64,
    /// Sum of `elapsed - interval` over all invocations.
    pub lateness: Duration,
    /// Number of completed invocations.
    pub runs: u32,
}

struct TaskEntry<F> {
    /// `None` while the task is running.
    callback: Option<F>,
    priority: Priority,
    interval: Duration,
    last_run: u64,
    lateness: Duration,
    runs: u32,
}

/// Ordered collection of task entries, generic over the callback type.
pub struct TaskRegistry<F> {
    entries: Slots<TaskId, TaskEntry<F>>,
    last_id: u32,
}

impl<F> TaskRegistry<F> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: Slots::new(capacity),
            last_id: 0,
        }
    }

    /// Append a task. It becomes due once `interval` has passed since tick 0.
    pub fn add(
        &mut self,
        callback: F,
        interval: Duration,
        priority: Priority,
    ) -> Result<TaskId, SchedulerError> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(SchedulerError::CapacityExhausted)?;
        let id = TaskId(next);
        self.entries.try_push(
            id,
            TaskEntry {
                callback: Some(callback),
                priority,
                interval,
                last_run: 0,
                lateness: Duration::from_ticks(0),
                runs: 0,
            },
        )?;
        self.last_id = next;
        Ok(id)
    }

    /// Remove the task with the given id. Returns `false` if it is unknown.
    pub fn remove(&mut self, id: TaskId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// The most recently issued id, if any.
    pub fn last_issued(&self) -> Option<TaskId> {
        (self.last_id > 0).then_some(TaskId(self.last_id))
    }

    /// Next task after `cursor`, up to and including `last`, optionally
    /// restricted to one priority level.
    pub fn next_after(
        &self,
        cursor: Option<TaskId>,
        last: TaskId,
        level: Option<Priority>,
    ) -> Option<TaskId> {
        self.entries
            .iter_after(cursor)
            .take_while(|(id, _)| *id <= last)
            .find(|(_, task)| level.is_none_or(|level| task.priority == level))
            .map(|(id, _)| id)
    }

    /// If the task is due at `now`, move its callback out and return it with
    /// the time elapsed since its last run.
    ///
    /// Returns `None` if the task is unknown, not yet due, or already running.
    pub fn take_if_due(&mut self, id: TaskId, now: u64, width: u32) -> Option<(F, Duration)> {
        let task = self.entries.get_mut(id)?;
        let elapsed = Duration::from_micros(time_diff(task.last_run, now, width));
        if elapsed < task.interval {
            return None;
        }
        let callback = task.callback.take()?;
        Some((callback, elapsed))
    }

    /// Return a callback taken with [`take_if_due`](Self::take_if_due) and
    /// record the run.
    ///
    /// Returns `false`, dropping the callback, if the task was removed while
    /// it ran.
    pub fn complete(
        &mut self,
        id: TaskId,
        callback: F,
        elapsed: Duration,
        finished: u64,
    ) -> bool {
        let Some(task) = self.entries.get_mut(id) else {
            return false;
        };
        let late = elapsed
            .checked_sub(task.interval)
            .unwrap_or(Duration::from_ticks(0));
        task.callback = Some(callback);
        task.last_run = finished;
        task.lateness = task.lateness.checked_add(late).unwrap_or(Duration::MAX);
        task.runs = task.runs.saturating_add(1);
        true
    }

    pub fn info(&self, id: TaskId) -> Option<TaskInfo> {
        self.entries.get(id).map(|task| TaskInfo {
            priority: task.priority,
            interval: task.interval,
            last_run: task.last_run,
            lateness: task.lateness,
            runs: task.runs,
        })
    }

    /// Ids of all registered tasks in run order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// The growth policy this registry was created with.
    pub fn policy(&self) -> Capacity {
        self.entries.policy()
    }
}
