//! Append-only in-memory event buffer.

use crate::event::InteractionEvent;

/// Ordered sequence of events not yet acknowledged by the collector.
///
/// Order is insertion order; nothing is ever reordered or merged. The only
/// removals are a wholesale [`replace`](Self::replace) at restore time and
/// dropping a delivered prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBuffer {
    events: Vec<InteractionEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InteractionEvent) {
        self.events.push(event);
    }

    /// Swap in a restored sequence.
    pub fn replace(&mut self, events: Vec<InteractionEvent>) {
        self.events = events;
    }

    /// Drop the first `count` events (the ones a collector acknowledged).
    pub fn drain_delivered(&mut self, count: usize) {
        let count = count.min(self.events.len());
        self.events.drain(..count);
    }

    pub fn as_slice(&self) -> &[InteractionEvent] {
        &self.events
    }

    pub fn snapshot(&self) -> Vec<InteractionEvent> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(label: &str, ts: i64) -> InteractionEvent {
        InteractionEvent::new(label).with_timestamp(ts)
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut buffer = EventBuffer::new();
        buffer.push(event("b", 2));
        buffer.push(event("a", 1));
        let labels: Vec<_> = buffer.as_slice().iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn test_drain_delivered_keeps_later_events() {
        let mut buffer = EventBuffer::new();
        for (i, label) in ["a", "b", "c"].iter().enumerate() {
            buffer.push(event(label, i as i64));
        }
        buffer.drain_delivered(2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.as_slice()[0].event_type, "c");

        buffer.drain_delivered(10);
        assert!(buffer.is_empty());
    }
}
