//! Bounded FIFO of messages awaiting dispatch.

use alloc::collections::VecDeque;
use alloc::string::String;

use crate::error::SchedulerError;
use crate::util::copy_str;

/// A published message with owned topic and payload.
///
/// Both strings are heap copies of any length; the payload is opaque to the
/// bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: String,
}

impl Message {
    /// Copy `topic` and `payload` into a new message.
    pub fn new(topic: &str, payload: &str) -> Result<Self, SchedulerError> {
        Ok(Self {
            topic: copy_str(topic)?,
            payload: copy_str(payload)?,
        })
    }

    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    pub fn payload(&self) -> &str {
        self.payload.as_str()
    }
}

/// Fixed-capacity FIFO of [`Message`]s.
///
/// Storage for `depth` messages is reserved on construction and the queue
/// never grows past it.
pub struct MessageQueue {
    messages: VecDeque<Message>,
    depth: usize,
}

impl MessageQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Copy `topic` and `payload` into a new message at the tail.
    ///
    /// When the queue is full the message is dropped, the queue is left
    /// untouched, and [`SchedulerError::QueueFull`] is returned. The only
    /// other failure is the allocator refusing the copy
    /// ([`SchedulerError::CapacityExhausted`]).
    pub fn enqueue(&mut self, topic: &str, payload: &str) -> Result<(), SchedulerError> {
        if self.is_full() {
            warn!("message queue full ({}), dropping message on {}", self.depth, topic);
            return Err(SchedulerError::QueueFull);
        }
        let message = Message::new(topic, payload)?;
        self.messages.push_back(message);
        Ok(())
    }

    /// Remove and return the message at the head.
    pub fn dequeue(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    /// Dequeue every message in order and hand it to `consumer`.
    ///
    /// The scheduler dequeues one message at a time instead, since its
    /// subscribers need `&mut Scheduler` while a message is being delivered.
    pub fn drain(&mut self, mut consumer: impl FnMut(Message)) {
        while let Some(message) = self.dequeue() {
            consumer(message);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.depth
    }

    /// Maximum number of queued messages.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
