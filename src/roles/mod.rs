pub mod consumer;
pub mod producer;
pub mod sources;

use std::sync::Arc;

use atomic::{Atomic, Ordering};
use crossbeam::channel::Sender;
use thiserror::Error;

pub use consumer::Consumer;
pub use producer::{Producer, ProducerMode};

use crate::message::{BufferId, ConsumerId, Delivery};

#[derive(Debug, Error, Clone)]
pub enum RoleError {
    #[error("Error while delivering to the sink: {0}")]
    SinkError(String),
    #[error("Role {0:?} panicked before completing")]
    JoinError(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoleStatus {
    Running,
    Stopping,
}

/// Cooperative cancellation token, checked once per role loop iteration. A
/// stop request is advisory: it takes effect at the next check, never by
/// interrupting a produce blocked on backpressure or a sleep in progress, so
/// shutdown latency is bounded by one iteration of the role's loop.
#[derive(Clone)]
pub struct StopToken {
    status: Arc<Atomic<RoleStatus>>,
}

impl StopToken {
    pub fn new() -> Self {
        StopToken {
            status: Arc::new(Atomic::new(RoleStatus::Running)),
        }
    }

    pub fn stop(&self) {
        self.status.store(RoleStatus::Stopping, Ordering::Relaxed);
    }

    pub fn is_stopping(&self) -> bool {
        self.status.load(Ordering::Relaxed) == RoleStatus::Stopping
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides what a producer sends. Implementations live outside the core; the
/// stock generators are in [`sources`].
pub trait MessageSource: Send {
    type Output: Clone + Send + Sync + 'static;

    fn next_ordinary(&mut self) -> Self::Output;

    fn next_special(&mut self) -> Self::Output;
}

/// Receives everything a consumer reads. Console reporting and test
/// collection both sit behind this seam, keeping output out of the core.
pub trait DeliverySink<T>: Send {
    fn deliver(
        &mut self,
        consumer: &ConsumerId,
        buffer: &BufferId,
        delivery: Delivery<T>,
    ) -> Result<(), RoleError>;
}

/// Forwards deliveries over a crossbeam channel to whoever holds the
/// receiver.
pub struct ChannelSink<T> {
    sender: Sender<(ConsumerId, BufferId, Delivery<T>)>,
}

impl<T> ChannelSink<T> {
    pub fn new(sender: Sender<(ConsumerId, BufferId, Delivery<T>)>) -> Self {
        ChannelSink { sender }
    }
}

impl<T: Send> DeliverySink<T> for ChannelSink<T> {
    fn deliver(
        &mut self,
        consumer: &ConsumerId,
        buffer: &BufferId,
        delivery: Delivery<T>,
    ) -> Result<(), RoleError> {
        self.sender
            .send((consumer.clone(), buffer.clone(), delivery))
            .map_err(|_| {
                RoleError::SinkError(
                    "Could not report because the channel is disconnected".to_string(),
                )
            })
    }
}
