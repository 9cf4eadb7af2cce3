use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{MessageSource, RoleError, StopToken};
use crate::buffers::sync_buffer::SyncBuffer;
use crate::message::envelope::SpecialEnvelope;

/// What a producer sends each cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProducerMode {
    /// One ordinary message to one randomly chosen buffer.
    Ordinary,
    /// One special message broadcast to every buffer in the set, sharing a
    /// single envelope.
    Special,
    /// Ordinary most cycles, special with the given probability.
    Mixed { special_ratio: f64 },
}

impl ProducerMode {
    /// The bias of the reference system: one special message in four cycles.
    pub fn mixed_default() -> Self {
        ProducerMode::Mixed {
            special_ratio: 0.25,
        }
    }
}

/// Thread role feeding a set of buffers. A seed producer emits one ordinary
/// message per buffer and exits on its own; a looping producer emits one
/// message per cycle, sleeps its interval, and re-checks its stop token.
pub struct Producer<G: MessageSource> {
    id: String,
    buffers: Vec<Arc<SyncBuffer<G::Output>>>,
    mode: ProducerMode,
    interval: Duration,
    seed_phase: bool,
    token: StopToken,
    source: Option<G>,
    handle: Option<JoinHandle<()>>,
}

impl<G: MessageSource + 'static> Producer<G> {
    pub fn new(
        id: String,
        buffers: Vec<Arc<SyncBuffer<G::Output>>>,
        source: G,
        mode: ProducerMode,
        interval: Duration,
    ) -> Self {
        Producer {
            id,
            buffers,
            mode,
            interval,
            seed_phase: false,
            token: StopToken::new(),
            source: Some(source),
            handle: None,
        }
    }

    /// A producer that emits exactly one ordinary message per buffer and
    /// terminates, used to fill buffers before consumers start.
    pub fn seed(id: String, buffers: Vec<Arc<SyncBuffer<G::Output>>>, source: G) -> Self {
        let mut producer = Self::new(id, buffers, source, ProducerMode::Ordinary, Duration::ZERO);
        producer.seed_phase = true;
        producer
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&mut self) {
        let source = match self.source.take() {
            Some(source) => source,
            None => panic!("Producer {} already started!", self.id),
        };
        let id = self.id.clone();
        let buffers = self.buffers.clone();
        let mode = self.mode;
        let interval = self.interval;
        let seed_phase = self.seed_phase;
        let token = self.token.clone();
        self.handle = Some(thread::spawn(move || {
            if seed_phase {
                seed_loop(id, buffers, source);
            } else {
                produce_loop(id, buffers, source, mode, interval, token);
            }
        }));
    }

    /// Advisory stop: observed at the next token check, after the current
    /// sleep or production completes.
    pub fn stop(&self) {
        self.token.stop();
    }

    pub fn join(&mut self) -> Result<(), RoleError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RoleError::JoinError(self.id.clone())),
            None => Ok(()),
        }
    }
}

fn seed_loop<G: MessageSource>(
    id: String,
    buffers: Vec<Arc<SyncBuffer<G::Output>>>,
    mut source: G,
) {
    for buffer in &buffers {
        buffer.produce(source.next_ordinary());
    }
    debug!("Seed producer {:?} done", id);
}

fn produce_loop<G: MessageSource>(
    id: String,
    buffers: Vec<Arc<SyncBuffer<G::Output>>>,
    mut source: G,
    mode: ProducerMode,
    interval: Duration,
    token: StopToken,
) {
    let mut rng = rand::thread_rng();
    while !token.is_stopping() {
        match mode {
            ProducerMode::Ordinary => produce_ordinary(&mut source, &buffers, &mut rng),
            ProducerMode::Special => broadcast_special(&mut source, &buffers),
            ProducerMode::Mixed { special_ratio } => {
                if rng.gen_bool(special_ratio) {
                    broadcast_special(&mut source, &buffers);
                } else {
                    produce_ordinary(&mut source, &buffers, &mut rng);
                }
            }
        }
        thread::sleep(interval);
    }
    debug!("Producer {:?} stopped", id);
}

fn produce_ordinary<G: MessageSource>(
    source: &mut G,
    buffers: &[Arc<SyncBuffer<G::Output>>],
    rng: &mut impl Rng,
) {
    if let Some(buffer) = buffers.choose(rng) {
        buffer.produce(source.next_ordinary());
    }
}

fn broadcast_special<G: MessageSource>(source: &mut G, buffers: &[Arc<SyncBuffer<G::Output>>]) {
    let envelope = Arc::new(SpecialEnvelope::new(source.next_special()));
    for buffer in buffers {
        buffer.post_special(&envelope);
    }
}
