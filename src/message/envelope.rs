use std::collections::HashSet;
use std::sync::Mutex;

use crate::message::ConsumerId;

#[derive(Debug, Default)]
struct DeliveryState {
    reads: usize,
    read_by: HashSet<ConsumerId>,
    acknowledged: HashSet<ConsumerId>,
}

/// A special message plus its delivery-tracking state. The envelope carries
/// its own lock, distinct from any buffer lock; when a buffer touches an
/// envelope it already holds its own lock, so the nesting order is always
/// buffer first, envelope second.
///
/// One envelope may be posted to many buffers through a shared `Arc`. The
/// tracking state is then global across those buffers: a read or an
/// acknowledgment anywhere counts everywhere, and the message is used up once
/// its limit is reached on any buffer.
#[derive(Debug)]
pub struct SpecialEnvelope<T> {
    content: T,
    state: Mutex<DeliveryState>,
}

impl<T: Clone> SpecialEnvelope<T> {
    pub fn new(content: T) -> Self {
        SpecialEnvelope {
            content,
            state: Mutex::new(DeliveryState::default()),
        }
    }

    pub fn content(&self) -> T {
        self.content.clone()
    }

    /// Records one counted-policy delivery.
    pub fn record_read(&self) {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
    }

    pub fn is_read_limit_reached(&self, read_limit: usize) -> bool {
        self.state.lock().unwrap().reads >= read_limit
    }

    /// Marks that `consumer` was handed this content, so the same consumer is
    /// not handed it again while the envelope stays pending.
    pub fn mark_read_by(&self, consumer: &ConsumerId) {
        let mut state = self.state.lock().unwrap();
        state.read_by.insert(consumer.clone());
    }

    pub fn was_read_by(&self, consumer: &ConsumerId) -> bool {
        self.state.lock().unwrap().read_by.contains(consumer)
    }

    /// Adds `consumer` to the acknowledgment set and returns the set size.
    /// Set semantics: acknowledging twice before eviction counts once.
    pub fn acknowledge(&self, consumer: &ConsumerId) -> usize {
        let mut state = self.state.lock().unwrap();
        state.acknowledged.insert(consumer.clone());
        state.acknowledged.len()
    }

    pub fn acknowledgment_count(&self) -> usize {
        self.state.lock().unwrap().acknowledged.len()
    }
}

#[cfg(test)]
mod envelope_tests {
    use super::*;

    #[test]
    fn test_read_limit_reached_after_configured_reads() {
        let envelope = SpecialEnvelope::new("S1".to_string());
        assert!(!envelope.is_read_limit_reached(3));
        for _ in 0..3 {
            envelope.record_read();
        }
        assert!(envelope.is_read_limit_reached(3));
        assert!(!envelope.is_read_limit_reached(4));
    }

    #[test]
    fn test_acknowledge_is_idempotent_per_consumer() {
        let envelope = SpecialEnvelope::new("S1".to_string());
        let consumer = ConsumerId::from("c0");
        assert_eq!(envelope.acknowledge(&consumer), 1);
        assert_eq!(envelope.acknowledge(&consumer), 1);
        assert_eq!(envelope.acknowledge(&ConsumerId::from("c1")), 2);
        assert_eq!(envelope.acknowledgment_count(), 2);
    }

    #[test]
    fn test_read_marks_are_per_consumer() {
        let envelope = SpecialEnvelope::new("S1".to_string());
        let consumer = ConsumerId::from("c0");
        assert!(!envelope.was_read_by(&consumer));
        envelope.mark_read_by(&consumer);
        assert!(envelope.was_read_by(&consumer));
        assert!(!envelope.was_read_by(&ConsumerId::from("c1")));
    }
}
