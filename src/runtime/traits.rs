//! Platform collaborator trait.
//!
//! The scheduler core is platform-agnostic. Anything that differs between
//! targets, such as feeding a hardware watchdog or handing control back to a
//! Wi-Fi stack between tasks, goes through [`Platform`]. Every method has a
//! no-op default, so hosts without such concerns can use [`NoopPlatform`].
//!
//! # Example
//!
//! ```ignore
//! struct Esp8266 {
//!     wdt: Watchdog,
//! }
//!
//! impl Platform for Esp8266 {
//!     fn arm_watchdog(&mut self) {
//!         self.wdt.enable(Duration::from_secs(8));
//!     }
//!
//!     fn watchdog_reset(&mut self) {
//!         self.wdt.feed();
//!     }
//!
//!     fn yield_now(&mut self) {
//!         esp_yield();
//!     }
//! }
//! ```

/// Hooks the scheduler calls into the host platform.
pub trait Platform {
    /// Called once when the scheduler is constructed.
    fn arm_watchdog(&mut self) {}

    /// Called once at the end of every pass to signal progress.
    fn watchdog_reset(&mut self) {}

    /// Called after every task slot of a pass, whether or not the task ran.
    fn yield_now(&mut self) {}
}

/// A platform with no watchdog and nothing to yield to.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPlatform;

impl Platform for NoopPlatform {}

/// Blanket implementation for mutable references, so a host can keep
/// ownership of its platform object.
impl<P: Platform + ?Sized> Platform for &mut P {
    fn arm_watchdog(&mut self) {
        (**self).arm_watchdog()
    }

    fn watchdog_reset(&mut self) {
        (**self).watchdog_reset()
    }

    fn yield_now(&mut self) {
        (**self).yield_now()
    }
}
