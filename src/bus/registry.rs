//! Subscription registry for the message bus.

use alloc::string::String;

use crate::config::Capacity;
use crate::error::SchedulerError;
use crate::topic;
use crate::util::{Slots, copy_str};

/// Identifies a subscription for [`SubscriptionRegistry::unsubscribe`].
///
/// Handles start at 1 and increase by one per `subscribe` call over the whole
/// lifetime of the registry. They are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriptionHandle(u32);

impl SubscriptionHandle {
    /// The raw handle value, always positive.
    pub fn get(self) -> u32 {
        self.0
    }
}

struct Subscription<F> {
    pattern: String,
    /// `None` while the callback is being invoked.
    callback: Option<F>,
}

/// Ordered collection of `(handle, pattern, callback)` entries.
///
/// The registry is generic over the callback type so the scheduler can store
/// boxed closures while tests use plain ones.
pub struct SubscriptionRegistry<F> {
    entries: Slots<SubscriptionHandle, Subscription<F>>,
    last_handle: u32,
}

impl<F> SubscriptionRegistry<F> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: Slots::new(capacity),
            last_handle: 0,
        }
    }

    /// Register `callback` for every topic matching `pattern`.
    ///
    /// The pattern is copied. Wildcard misuse is not validated here; such a
    /// pattern simply never matches. Every call consumes a handle value, even
    /// one that fails.
    pub fn subscribe(
        &mut self,
        pattern: &str,
        callback: F,
    ) -> Result<SubscriptionHandle, SchedulerError> {
        self.last_handle = self
            .last_handle
            .checked_add(1)
            .ok_or(SchedulerError::CapacityExhausted)?;
        let handle = SubscriptionHandle(self.last_handle);
        let pattern = copy_str(pattern)?;
        self.entries.try_push(
            handle,
            Subscription {
                pattern,
                callback: Some(callback),
            },
        )?;
        Ok(handle)
    }

    /// Remove the subscription with the given handle.
    ///
    /// Returns `false` if no such subscription exists.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        self.entries.remove(handle).is_some()
    }

    /// Invoke `dispatch` for every subscription whose pattern matches `topic`,
    /// in registration order.
    ///
    /// `dispatch` cannot reach the registry, so this suits callers without
    /// reentrant callbacks. The scheduler walks with
    /// [`next_match`](Self::next_match) and
    /// [`take_callback`](Self::take_callback) instead.
    pub fn for_each_match(
        &mut self,
        topic: &str,
        mut dispatch: impl FnMut(SubscriptionHandle, &mut F),
    ) {
        for (handle, sub) in self.entries.iter_mut() {
            if let Some(callback) = sub.callback.as_mut()
                && topic::matches(topic, &sub.pattern)
            {
                dispatch(handle, callback);
            }
        }
    }

    /// The most recently issued handle, if any.
    pub fn last_issued(&self) -> Option<SubscriptionHandle> {
        (self.last_handle > 0).then_some(SubscriptionHandle(self.last_handle))
    }

    /// Next subscription after `cursor`, up to and including `last`, whose
    /// pattern matches `topic`. Subscriptions whose callback is currently
    /// taken are skipped.
    pub fn next_match(
        &self,
        cursor: Option<SubscriptionHandle>,
        last: SubscriptionHandle,
        topic: &str,
    ) -> Option<SubscriptionHandle> {
        self.entries
            .iter_after(cursor)
            .take_while(|(handle, _)| *handle <= last)
            .find(|(_, sub)| sub.callback.is_some() && topic::matches(topic, &sub.pattern))
            .map(|(handle, _)| handle)
    }

    /// Move the callback out of its entry so it can be called while the
    /// registry is borrowed elsewhere.
    pub fn take_callback(&mut self, handle: SubscriptionHandle) -> Option<F> {
        self.entries.get_mut(handle)?.callback.take()
    }

    /// Put a callback taken with [`take_callback`](Self::take_callback) back.
    ///
    /// Returns `false`, dropping the callback, if the subscription was removed
    /// in the meantime.
    pub fn restore_callback(&mut self, handle: SubscriptionHandle, callback: F) -> bool {
        match self.entries.get_mut(handle) {
            Some(sub) => {
                sub.callback = Some(callback);
                true
            }
            None => false,
        }
    }

    /// The pattern registered under `handle`.
    pub fn pattern(&self, handle: SubscriptionHandle) -> Option<&str> {
        self.entries.get(handle).map(|sub| sub.pattern.as_str())
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

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    type Callback = u8;

    fn registry() -> SubscriptionRegistry<Callback> {
        SubscriptionRegistry::new(Capacity::default())
    }

    #[test]
    fn test_handles_start_at_one_and_increase() {
        let mut registry = registry();
        let a = registry.subscribe("a", 0).unwrap();
        let b = registry.subscribe("b", 1).unwrap();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn test_handles_never_reused() {
        let mut registry = registry();
        let mut handles = Vec::new();
        for i in 0..6u8 {
            let handle = registry.subscribe("x/+", i).unwrap();
            if i % 2 == 0 {
                assert!(registry.unsubscribe(handle));
            }
            handles.push(handle);
        }
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unsubscribe_unknown_handle() {
        let mut registry = registry();
        let handle = registry.subscribe("a", 0).unwrap();
        assert!(registry.unsubscribe(handle));
        assert!(!registry.unsubscribe(handle));
    }

    #[test]
    fn test_capacity_failure() {
        let mut registry: SubscriptionRegistry<Callback> =
            SubscriptionRegistry::new(Capacity::fixed(1));
        registry.subscribe("a", 0).unwrap();
        assert_eq!(registry.subscribe("b", 1), Err(SchedulerError::CapacityExhausted));
    }

    #[test]
    fn test_failed_subscribe_consumes_handle() {
        let mut registry: SubscriptionRegistry<Callback> =
            SubscriptionRegistry::new(Capacity::fixed(1));
        let a = registry.subscribe("a", 0).unwrap();
        assert!(registry.subscribe("b", 1).is_err());
        assert!(registry.unsubscribe(a));
        let c = registry.subscribe("c", 2).unwrap();
        assert_eq!((a.get(), c.get()), (1, 3));
    }

    #[test]
    fn test_long_pattern_accepted() {
        let mut registry = registry();
        let pattern = alloc::format!("{}#", "level/".repeat(64));
        let handle = registry.subscribe(&pattern, 0).unwrap();
        assert_eq!(registry.pattern(handle), Some(pattern.as_str()));

        let mut hits = 0;
        let topic = alloc::format!("{}x", "level/".repeat(64));
        registry.for_each_match(&topic, |_, _| hits += 1);
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_for_each_match_in_registration_order() {
        let mut registry = SubscriptionRegistry::new(Capacity::default());
        registry.subscribe("sensors/#", 'a').unwrap();
        registry.subscribe("weather/+", 'b').unwrap();
        registry.subscribe("sensors/+/temp", 'c').unwrap();

        let mut hits = Vec::new();
        registry.for_each_match("sensors/kitchen/temp", |_, cb| hits.push(*cb));
        assert_eq!(hits, ['a', 'c']);
    }

    #[test]
    fn test_malformed_pattern_accepted_but_silent() {
        let mut registry = SubscriptionRegistry::new(Capacity::default());
        let handle = registry.subscribe("a/#/b", ()).unwrap();
        assert_eq!(registry.pattern(handle), Some("a/#/b"));

        let mut hits = 0;
        registry.for_each_match("a/x/b", |_, _| hits += 1);
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_next_match_skips_taken_and_respects_bound() {
        let mut registry = SubscriptionRegistry::new(Capacity::default());
        let a = registry.subscribe("t", 1u8).unwrap();
        let b = registry.subscribe("t", 2).unwrap();
        let c = registry.subscribe("t", 3).unwrap();

        let cb = registry.take_callback(a).unwrap();
        assert_eq!(registry.next_match(None, c, "t"), Some(b));
        assert_eq!(registry.next_match(Some(b), b, "t"), None);
        assert!(registry.restore_callback(a, cb));
        assert_eq!(registry.next_match(None, c, "t"), Some(a));

        registry.unsubscribe(b);
        assert_eq!(registry.next_match(Some(a), c, "t"), Some(c));
        assert!(!registry.restore_callback(b, 9));
    }
}
