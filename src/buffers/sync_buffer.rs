use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{BufferConfig, BufferError, EvictionPolicy};
use crate::buffers::ordinary_queue::OrdinaryQueue;
use crate::message::envelope::SpecialEnvelope;
use crate::message::{BufferId, ConsumerId, Delivery};

struct BufferState<T> {
    ordinary: OrdinaryQueue<T>,
    pending_special: VecDeque<Arc<SpecialEnvelope<T>>>,
}

enum SpecialPoll<T> {
    /// A pending special message was handed out.
    Delivered(T),
    /// This call was spent evicting exhausted envelopes; nothing is returned.
    Spent,
    /// No special message pends for this consumer.
    Empty,
}

/// The monitor guarding one communication buffer: a bounded FIFO of ordinary
/// messages plus the list of pending special messages, under a single mutex
/// and a single condition shared by space waiters and data waiters. Wakeups
/// are always `notify_all`.
///
/// Ordinary inserts block while the FIFO is full (backpressure); ordinary
/// removal waits up to a caller timeout. Special messages never block and are
/// always preferred over ordinary ones, so broadcast latency is not starved
/// by ordinary traffic.
pub struct SyncBuffer<T> {
    id: BufferId,
    config: BufferConfig,
    state: Mutex<BufferState<T>>,
    space_or_data: Condvar,
}

impl<T: Clone> SyncBuffer<T> {
    pub fn new(id: BufferId, config: BufferConfig) -> Result<Self, BufferError> {
        config.validate()?;
        Ok(SyncBuffer {
            id,
            config,
            state: Mutex::new(BufferState {
                ordinary: OrdinaryQueue::new(config.capacity),
                pending_special: VecDeque::new(),
            }),
            space_or_data: Condvar::new(),
        })
    }

    pub fn with_capacity(id: BufferId, capacity: usize) -> Result<Self, BufferError> {
        Self::new(id, BufferConfig::with_capacity(capacity))
    }

    pub fn id(&self) -> &BufferId {
        &self.id
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.config.policy
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().ordinary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().ordinary.is_empty()
    }

    pub fn pending_special_len(&self) -> usize {
        self.state.lock().unwrap().pending_special.len()
    }

    /// Inserts one ordinary message, blocking while the buffer is at
    /// capacity. The lock is released while waiting and reacquired on wake.
    pub fn produce(&self, payload: T) {
        let mut state = self.state.lock().unwrap();
        while state.ordinary.is_full() {
            state = self.space_or_data.wait(state).unwrap();
        }
        state.ordinary.push(payload);
        debug!(
            "Ordinary message added to buffer {:?}, size {:?}",
            self.id,
            state.ordinary.len()
        );
        self.space_or_data.notify_all();
    }

    /// Posts one special message. The same envelope may be posted to several
    /// buffers, which then share its delivery tracking. Beyond
    /// `special_limit` pending entries the oldest are silently dropped.
    pub fn post_special(&self, envelope: &Arc<SpecialEnvelope<T>>) {
        let mut state = self.state.lock().unwrap();
        state.pending_special.push_back(envelope.clone());
        while state.pending_special.len() > self.config.special_limit {
            state.pending_special.pop_front();
            debug!(
                "Special list over limit on buffer {:?}, dropped oldest entry",
                self.id
            );
        }
        self.space_or_data.notify_all();
    }

    /// Removes one message for `consumer`. Pending special messages are
    /// served first, per the buffer's eviction policy; otherwise one ordinary
    /// message is removed, waiting up to `timeout` for one to arrive. `None`
    /// is the normal nothing-ready outcome, not an error.
    pub fn try_consume(&self, consumer: &ConsumerId, timeout: Duration) -> Option<Delivery<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            match self.poll_special(&mut state, consumer) {
                SpecialPoll::Delivered(payload) => {
                    debug!(
                        "Special message delivered to {:?} from buffer {:?}",
                        consumer, self.id
                    );
                    return Some(Delivery::special(payload));
                }
                SpecialPoll::Spent => return None,
                SpecialPoll::Empty => {}
            }
            if !state.ordinary.is_empty() {
                let payload = state
                    .ordinary
                    .pop()
                    .expect("ordinary queue drained while the buffer lock was held");
                // A slot was freed; wake any producer blocked on capacity.
                self.space_or_data.notify_all();
                return Some(Delivery::ordinary(payload));
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .space_or_data
                .wait_timeout(state, deadline - now)
                .unwrap()
                .0;
        }
    }

    /// Records that `consumer` has seen the head special message. Only
    /// meaningful under the quorum policy: once `quorum` distinct consumers
    /// acknowledged, the head is evicted. Acknowledging with nothing pending,
    /// or on a counted-policy buffer, is a logged no-op.
    pub fn acknowledge_special(&self, consumer: &ConsumerId) {
        let quorum = match self.config.policy {
            EvictionPolicy::Quorum { quorum } => quorum,
            EvictionPolicy::Counted { .. } => {
                debug!(
                    "Acknowledgment from {:?} ignored on counted-policy buffer {:?}",
                    consumer, self.id
                );
                return;
            }
        };
        let mut state = self.state.lock().unwrap();
        let reached = match state.pending_special.front() {
            Some(head) => {
                if !head.was_read_by(consumer) {
                    warn!(
                        "Consumer {:?} acknowledged a special message it was never handed on buffer {:?}",
                        consumer, self.id
                    );
                }
                head.acknowledge(consumer) >= quorum
            }
            None => {
                warn!(
                    "Consumer {:?} acknowledged on buffer {:?} with no special message pending",
                    consumer, self.id
                );
                return;
            }
        };
        if reached {
            state.pending_special.pop_front();
            debug!(
                "Special message reached its quorum on buffer {:?}, evicted",
                self.id
            );
        }
    }

    fn poll_special(&self, state: &mut BufferState<T>, consumer: &ConsumerId) -> SpecialPoll<T> {
        match self.config.policy {
            EvictionPolicy::Counted { read_limit } => {
                let mut evicted = false;
                while let Some(head) = state.pending_special.front() {
                    if !head.is_read_limit_reached(read_limit) {
                        head.record_read();
                        return SpecialPoll::Delivered(head.content());
                    }
                    state.pending_special.pop_front();
                    evicted = true;
                    debug!(
                        "Exhausted special message evicted from buffer {:?}",
                        self.id
                    );
                }
                if evicted {
                    SpecialPoll::Spent
                } else {
                    SpecialPoll::Empty
                }
            }
            EvictionPolicy::Quorum { quorum } => {
                // An envelope shared with another buffer may have reached its
                // quorum there; such heads are evicted lazily here.
                while let Some(head) = state.pending_special.front() {
                    if head.acknowledgment_count() < quorum {
                        break;
                    }
                    state.pending_special.pop_front();
                    debug!(
                        "Special message already at quorum evicted from buffer {:?}",
                        self.id
                    );
                }
                let envelope = state.pending_special.iter().find(|envelope| {
                    envelope.acknowledgment_count() < quorum && !envelope.was_read_by(consumer)
                });
                match envelope {
                    Some(envelope) => {
                        let envelope = envelope.clone();
                        envelope.mark_read_by(consumer);
                        SpecialPoll::Delivered(envelope.content())
                    }
                    None => SpecialPoll::Empty,
                }
            }
        }
    }
}
