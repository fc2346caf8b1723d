//! Remote diagnostics over the message bus.
//!
//! A [`Doctor`] subscribes to `<name>/#` and answers two requests with JSON
//! replies:
//!
//! - `<name>/timeinfo/get` -> `<name>/timeinfo`: uptime and clock reading
//! - `<name>/diagnostics/get` -> `<name>/diagnostics`: scheduler statistics
//!   and per-task bookkeeping
//!
//! When the bus is bridged to an MQTT broker any client can query a running
//! device this way.

use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;

use super::scheduler::Scheduler;
use super::traits::Platform;
use crate::bus::SubscriptionHandle;
use crate::error::SchedulerError;
use crate::time::Clock;
use crate::util::copy_str;

#[derive(Serialize)]
struct TimeInfo {
    /// Whole seconds since the scheduler was created.
    uptime: u64,
    millis: u64,
}

#[derive(Serialize)]
struct TaskReport {
    id: u32,
    priority: u8,
    interval_us: u64,
    runs: u32,
    lateness_us: u64,
    last_run: u64,
}

#[derive(Serialize)]
struct Diagnostics {
    passes: u64,
    tasks: usize,
    task_capacity: usize,
    subscriptions: usize,
    subscription_capacity: usize,
    queue_depth: usize,
    pending_messages: usize,
    task_info: Vec<TaskReport>,
}

/// Diagnostics responder. See the [module docs](self).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctor {
    name: String,
}

impl Doctor {
    /// A doctor answering under the topic prefix `name`.
    pub fn new(name: &str) -> Result<Self, SchedulerError> {
        Ok(Self {
            name: copy_str(name)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe the doctor to `<name>/#` on `sched`.
    ///
    /// The returned handle can be passed to
    /// [`Scheduler::unsubscribe`] to detach it again.
    pub fn attach<C: Clock, P: Platform>(
        self,
        sched: &mut Scheduler<C, P>,
    ) -> Result<SubscriptionHandle, SchedulerError> {
        let pattern = alloc::format!("{}/#", self.name);
        sched.subscribe(&pattern, move |s, topic, _| self.handle(s, topic))
    }

    fn handle<C: Clock, P: Platform>(&self, sched: &mut Scheduler<C, P>, topic: &str) {
        let Some(request) = topic
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return;
        };
        let reply = match request {
            "timeinfo/get" => serde_json::to_string(&time_info(sched)),
            "diagnostics/get" => serde_json::to_string(&diagnostics(sched)),
            _ => return,
        };
        let Ok(payload) = reply else {
            warn!("doctor {}: cannot encode reply to {}", self.name.as_str(), topic);
            return;
        };
        // strip the trailing "/get"
        let reply_topic = &topic[..topic.len() - 4];
        if sched.publish(reply_topic, &payload).is_err() {
            warn!("doctor {}: reply on {} dropped", self.name.as_str(), reply_topic);
        }
    }
}

impl Default for Doctor {
    fn default() -> Self {
        Self {
            name: String::from("doctor"),
        }
    }
}

fn time_info<C: Clock, P: Platform>(sched: &Scheduler<C, P>) -> TimeInfo {
    TimeInfo {
        uptime: sched.uptime().as_secs(),
        millis: sched.clock().now() / 1_000,
    }
}

fn diagnostics<C: Clock, P: Platform>(sched: &Scheduler<C, P>) -> Diagnostics {
    let task_info = sched
        .task_ids()
        .filter_map(|id| {
            let info = sched.task_info(id)?;
            Some(TaskReport {
                id: id.get(),
                priority: info.priority as u8,
                interval_us: info.interval.as_micros(),
                runs: info.runs,
                lateness_us: info.lateness.as_micros(),
                last_run: info.last_run,
            })
        })
        .collect();
    Diagnostics {
        passes: sched.passes(),
        tasks: sched.task_count(),
        task_capacity: sched.task_capacity(),
        subscriptions: sched.subscription_count(),
        subscription_capacity: sched.subscription_capacity(),
        queue_depth: sched.queue_depth(),
        pending_messages: sched.pending_messages(),
        task_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::runtime::traits::NoopPlatform;
    use crate::time::ManualClock;
    use alloc::rc::Rc;
    use core::cell::RefCell;
    use embassy_time::Duration;
    use serde_json::Value;

    type Replies = Rc<RefCell<Vec<(String, String)>>>;

    fn setup(clock: &ManualClock) -> (Scheduler<ManualClock, NoopPlatform>, Replies) {
        let config = SchedulerConfig::default().with_queue_depth(4);
        let mut sched = Scheduler::new(clock.clone(), NoopPlatform, config);
        Doctor::new("node/doctor").unwrap().attach(&mut sched).unwrap();

        let replies: Replies = Rc::new(RefCell::new(Vec::new()));
        let sink = replies.clone();
        sched
            .subscribe("node/doctor/+", move |_, topic, payload| {
                sink.borrow_mut()
                    .push((String::from(topic), String::from(payload)));
            })
            .unwrap();
        (sched, replies)
    }

    #[test]
    fn test_timeinfo_reply() {
        let clock = ManualClock::starting_at(2_000_000);
        let (mut sched, replies) = setup(&clock);

        clock.advance(Duration::from_secs(5));
        sched.publish("node/doctor/timeinfo/get", "").unwrap();
        sched.run_once();

        let replies = replies.borrow();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, "node/doctor/timeinfo");
        let json: Value = serde_json::from_str(&replies[0].1).unwrap();
        assert_eq!(json["uptime"], 5);
        assert_eq!(json["millis"], 7_000);
    }

    #[test]
    fn test_diagnostics_reply() {
        let clock = ManualClock::starting_at(1_000_000);
        let (mut sched, replies) = setup(&clock);
        let id = sched.add(Duration::from_millis(10), |_| {}).unwrap();

        sched.run_once();
        sched.publish("node/doctor/diagnostics/get", "").unwrap();
        sched.run_once();

        let replies = replies.borrow();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, "node/doctor/diagnostics");
        let json: Value = serde_json::from_str(&replies[0].1).unwrap();
        assert_eq!(json["passes"], 1);
        assert_eq!(json["tasks"], 1);
        assert_eq!(json["subscriptions"], 2);
        assert_eq!(json["queue_depth"], 4);
        assert_eq!(json["task_info"][0]["id"], id.get());
        assert_eq!(json["task_info"][0]["interval_us"], 10_000);
        assert_eq!(json["task_info"][0]["runs"], 1);
    }

    #[test]
    fn test_unrelated_topics_ignored() {
        let clock = ManualClock::new();
        let (mut sched, replies) = setup(&clock);

        sched.publish("node/doctor/restart", "").unwrap();
        sched.publish("node/doctor", "").unwrap();
        sched.publish("node/doctorx/timeinfo/get", "").unwrap();
        sched.run_once();

        let topics: Vec<String> = replies.borrow().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(topics, ["node/doctor/restart"]);
        assert_eq!(sched.pending_messages(), 0);
    }

    #[test]
    fn test_detach() {
        let clock = ManualClock::new();
        let mut sched: Scheduler<ManualClock> =
            Scheduler::new(clock.clone(), NoopPlatform, SchedulerConfig::default());
        let handle = Doctor::default().attach(&mut sched).unwrap();
        assert!(sched.unsubscribe(handle));

        sched.publish("doctor/timeinfo/get", "").unwrap();
        sched.run_once();
        assert_eq!(sched.pending_messages(), 0);
    }
}
