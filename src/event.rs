// src/event.rs

//! Normalized platform events and the bounded queue backends feed them into.

use crate::keys::{KeyCode, Modifiers};
use log::debug;
use std::collections::VecDeque;

/// Number of events the queue holds before it starts dropping.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Platform-agnostic events delivered to the application.
///
/// "No event" is expressed as `None` from [`EventQueue::pop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// User requested window close.
    Quit,
    KeyDown { key: KeyCode, modifiers: Modifiers },
    KeyUp { key: KeyCode, modifiers: Modifiers },
    /// The window contents were damaged and should be redrawn.
    WindowRefresh,
}

/// Fixed-capacity FIFO of [`PlatformEvent`]s.
///
/// A push onto a full queue is dropped; the queue never grows past
/// [`EVENT_QUEUE_CAPACITY`]. Under an event storm the oldest events survive.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<PlatformEvent>,
    dropped: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(EVENT_QUEUE_CAPACITY),
            dropped: 0,
        }
    }

    /// Append an event. Returns `false` if the queue was full and the event
    /// was discarded.
    pub fn push(&mut self, event: PlatformEvent) -> bool {
        if self.events.len() >= EVENT_QUEUE_CAPACITY {
            self.dropped += 1;
            debug!("Event queue full, dropping {:?}", event);
            return false;
        }
        self.events.push_back(event);
        true
    }

    pub fn pop(&mut self) -> Option<PlatformEvent> {
        self.events.pop_front()
    }

    /// Move as many events from `other` as fit, dropping the rest.
    pub fn append_from(&mut self, other: &mut EventQueue) {
        while let Some(event) = other.pop() {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= EVENT_QUEUE_CAPACITY
    }

    /// Total events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
