use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use super::{DeliverySink, RoleError, StopToken};
use crate::buffers::sync_buffer::SyncBuffer;
use crate::message::ConsumerId;

/// Thread role polling a set of buffers in turn. Deliveries go to the
/// configured sink; special messages read from quorum-policy buffers are
/// acknowledged right after delivery. The consumer holds no locks of its own;
/// each buffer's monitor is the only synchronization involved.
pub struct Consumer<T> {
    id: ConsumerId,
    buffers: Vec<Arc<SyncBuffer<T>>>,
    poll_delay: Duration,
    timeout: Duration,
    token: StopToken,
    sink: Option<Box<dyn DeliverySink<T>>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> Consumer<T> {
    pub fn new(
        id: ConsumerId,
        buffers: Vec<Arc<SyncBuffer<T>>>,
        sink: Box<dyn DeliverySink<T>>,
        poll_delay: Duration,
        timeout: Duration,
    ) -> Self {
        Consumer {
            id,
            buffers,
            poll_delay,
            timeout,
            token: StopToken::new(),
            sink: Some(sink),
            handle: None,
        }
    }

    pub fn id(&self) -> &ConsumerId {
        &self.id
    }

    pub fn start(&mut self) {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => panic!("Consumer {:?} already started!", self.id),
        };
        let id = self.id.clone();
        let buffers = self.buffers.clone();
        let poll_delay = self.poll_delay;
        let timeout = self.timeout;
        let token = self.token.clone();
        self.handle = Some(thread::spawn(move || {
            consume_loop(id, buffers, sink, poll_delay, timeout, token);
        }));
    }

    /// Advisory stop: observed at the next token check. Shutdown latency is
    /// bounded by one pass over the buffer set, each visit costing at most
    /// `timeout` plus `poll_delay`.
    pub fn stop(&self) {
        self.token.stop();
    }

    pub fn join(&mut self) -> Result<(), RoleError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RoleError::JoinError(self.id.id.clone())),
            None => Ok(()),
        }
    }
}

fn consume_loop<T: Clone + Send + Sync>(
    id: ConsumerId,
    buffers: Vec<Arc<SyncBuffer<T>>>,
    mut sink: Box<dyn DeliverySink<T>>,
    poll_delay: Duration,
    timeout: Duration,
    token: StopToken,
) {
    'outer: while !token.is_stopping() {
        for buffer in &buffers {
            if let Some(delivery) = buffer.try_consume(&id, timeout) {
                let special = delivery.is_special();
                if let Err(err) = sink.deliver(&id, buffer.id(), delivery) {
                    warn!("Consumer {:?} sink failed, stopping: {:?}", id, err);
                    break 'outer;
                }
                if special && buffer.policy().requires_acknowledgment() {
                    buffer.acknowledge_special(&id);
                }
            }
            thread::sleep(poll_delay);
        }
    }
    debug!("Consumer {:?} stopped", id);
}

#[cfg(test)]
mod consumer_tests {
    use super::*;
    use crate::buffers::{BufferConfig, EvictionPolicy};
    use crate::message::{BufferId, Delivery, SpecialEnvelope};
    use crate::roles::ChannelSink;
    use crossbeam::channel::unbounded;
    use std::time::Instant;

    type Report = (ConsumerId, BufferId, Delivery<String>);

    fn test_consumer(
        buffers: Vec<Arc<SyncBuffer<String>>>,
        sink: Box<dyn DeliverySink<String>>,
    ) -> Consumer<String> {
        Consumer::new(
            ConsumerId::from("c0"),
            buffers,
            sink,
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_consumer_reports_deliveries_in_buffer_order() {
        let buffer = Arc::new(SyncBuffer::with_capacity(BufferId::from("buffer-0"), 10).unwrap());
        for i in 0..3 {
            buffer.produce(format!("m{}", i));
        }

        let (sender, receiver) = unbounded::<Report>();
        let mut consumer = test_consumer(vec![buffer.clone()], Box::new(ChannelSink::new(sender)));
        consumer.start();

        for i in 0..3 {
            let (consumer_id, buffer_id, delivery) =
                receiver.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(consumer_id, ConsumerId::from("c0"));
            assert_eq!(buffer_id, BufferId::from("buffer-0"));
            assert_eq!(delivery.payload, format!("m{}", i));
            assert!(!delivery.is_special());
        }

        consumer.stop();
        consumer.join().unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_consumer_acknowledges_specials_on_quorum_buffers() {
        let buffer = Arc::new(
            SyncBuffer::new(
                BufferId::from("buffer-0"),
                BufferConfig::with_capacity(10)
                    .with_policy(EvictionPolicy::Quorum { quorum: 1 }),
            )
            .unwrap(),
        );
        let envelope = Arc::new(SpecialEnvelope::new("S1".to_string()));
        buffer.post_special(&envelope);

        let (sender, receiver) = unbounded::<Report>();
        let mut consumer = test_consumer(vec![buffer.clone()], Box::new(ChannelSink::new(sender)));
        consumer.start();

        let (_, _, delivery) = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(delivery.is_special());
        assert_eq!(delivery.payload, "S1");

        // Quorum of one: the consumer's own acknowledgment evicts the head.
        let deadline = Instant::now() + Duration::from_secs(1);
        while buffer.pending_special_len() > 0 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(5));
        }

        consumer.stop();
        consumer.join().unwrap();
        assert_eq!(envelope.acknowledgment_count(), 1);
    }

    #[test]
    fn test_consumer_stops_when_the_sink_fails() {
        let buffer = Arc::new(SyncBuffer::with_capacity(BufferId::from("buffer-0"), 10).unwrap());
        buffer.produce("m0".to_string());

        let (sender, receiver) = unbounded::<Report>();
        drop(receiver);
        let mut consumer = test_consumer(vec![buffer], Box::new(ChannelSink::new(sender)));
        consumer.start();

        // The failed delivery makes the role exit without a stop request.
        consumer.join().unwrap();
    }

    #[test]
    fn test_consumer_stops_on_token_with_nothing_to_read() {
        let buffer = Arc::new(SyncBuffer::with_capacity(BufferId::from("buffer-0"), 10).unwrap());
        let (sender, _receiver) = unbounded::<Report>();
        let mut consumer = test_consumer(vec![buffer], Box::new(ChannelSink::new(sender)));
        consumer.start();
        thread::sleep(Duration::from_millis(30));
        consumer.stop();
        consumer.join().unwrap();
    }
}
