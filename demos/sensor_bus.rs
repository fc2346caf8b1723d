//! Example: a sensor node driven by the cooperative scheduler
//!
//! This example runs on a host and simulates a small device with:
//!
//! - a sampling task that reads a temperature every 250 ms and publishes the
//!   smoothed value when it changes
//! - a display subscription that prints every reading
//! - a command subscription that changes the reported unit
//! - a doctor answering diagnostics requests under `node/doctor`
//! - a heartbeat task that stops the demo after a few seconds
//!
//! On a real target the clock would wrap the hardware timer and the platform
//! would feed the watchdog; here both are backed by `std`.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use embassy_time::Duration;
use myrtio_sched::{
    Clock, Doctor, Heartbeat, Platform, Priority, Scheduler, SchedulerConfig, SensorProcessor,
};

/// Microseconds since program start.
struct StdClock {
    origin: Instant,
}

impl Clock for StdClock {
    fn now(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Sleeps briefly between task slots instead of spinning.
#[derive(Default)]
struct HostPlatform {
    feeds: u64,
}

impl Platform for HostPlatform {
    fn watchdog_reset(&mut self) {
        self.feeds += 1;
    }

    fn yield_now(&mut self) {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

fn main() {
    let clock = StdClock {
        origin: Instant::now(),
    };
    let config = SchedulerConfig::default().with_queue_depth(8);
    let mut sched = Scheduler::new(clock, HostPlatform::default(), config);

    let fahrenheit = Rc::new(Cell::new(false));

    let unit = fahrenheit.clone();
    sched
        .subscribe("node/cmd/unit", move |_, _, payload| {
            unit.set(payload == "F");
        })
        .expect("subscribe");

    sched
        .subscribe("node/sensors/+/temp", |_, topic, payload| {
            println!("{topic}: {payload}");
        })
        .expect("subscribe");

    Doctor::new("node/doctor")
        .and_then(|doctor| doctor.attach(&mut sched))
        .expect("attach doctor");
    sched
        .subscribe("node/doctor/diagnostics", |_, _, payload| {
            println!("diagnostics: {payload}");
        })
        .expect("subscribe");

    let unit = fahrenheit.clone();
    let mut sample = 0u32;
    let mut filter: Option<SensorProcessor> = None;
    sched
        .add(Duration::from_millis(250), move |s| {
            sample += 1;
            let raw = 20.0 + f64::from(sample % 10) * 0.3;
            let temp = filter.get_or_insert_with(|| {
                SensorProcessor::new(s.clock(), 5, Duration::from_secs(2), 0.2)
            });
            if let Some(celsius) = temp.filter(s.clock(), raw) {
                let reading = if unit.get() {
                    format!("{:.1} F", celsius * 9.0 / 5.0 + 32.0)
                } else {
                    format!("{celsius:.1} C")
                };
                if s.publish("node/sensors/living/temp", &reading).is_err() {
                    eprintln!("queue full, reading dropped");
                }
            }
            if sample == 8 {
                let _ = s.publish("node/cmd/unit", "F");
            }
            if sample == 12 {
                let _ = s.publish("node/doctor/diagnostics/get", "");
            }
        })
        .expect("add sampler");

    let running = Rc::new(Cell::new(true));
    let flag = running.clone();
    let mut lifetime: Option<Heartbeat> = None;
    sched
        .add_with_priority(Duration::from_millis(100), Priority::Low, move |s| {
            let beat =
                lifetime.get_or_insert_with(|| Heartbeat::new(s.clock(), Duration::from_secs(4)));
            if beat.beat(s.clock()) > 0 {
                flag.set(false);
            }
        })
        .expect("add heartbeat");

    while running.get() {
        sched.run_once();
    }

    println!(
        "done after {} passes, watchdog fed {} times",
        sched.passes(),
        sched.platform().feeds
    );
}
