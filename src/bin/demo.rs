extern crate relay_buffer;

use std::{sync::Arc, thread, time::Duration};

use itertools::Itertools;
use rand::Rng;

use relay_buffer::{
    buffers::{BufferConfig, EvictionPolicy, SyncBuffer},
    message::{BufferId, ConsumerId, Delivery},
    roles::{
        sources::LetterSource, Consumer, DeliverySink, Producer, ProducerMode, RoleError,
    },
};

struct PrintSink;

impl DeliverySink<String> for PrintSink {
    fn deliver(
        &mut self,
        consumer: &ConsumerId,
        buffer: &BufferId,
        delivery: Delivery<String>,
    ) -> Result<(), RoleError> {
        println!(
            "Consumer {} read message: {} from buffer {} (special: {})",
            consumer.id,
            delivery.payload,
            buffer.id,
            delivery.is_special()
        );
        Ok(())
    }
}

fn setup_buffers(count: usize, config: BufferConfig) -> Vec<Arc<SyncBuffer<String>>> {
    (0..count)
        .map(|i| {
            Arc::new(SyncBuffer::new(BufferId::from(format!("buffer-{i}")), config).unwrap())
        })
        .collect_vec()
}

fn start_consumers(
    count: usize,
    buffers: &[Arc<SyncBuffer<String>>],
) -> Vec<Consumer<String>> {
    let mut rng = rand::thread_rng();
    let mut consumers = (0..count)
        .map(|i| {
            Consumer::new(
                ConsumerId::from(format!("consumer-{i}")),
                buffers.to_vec(),
                Box::new(PrintSink),
                Duration::from_millis(rng.gen_range(100..500)),
                Duration::from_millis(100),
            )
        })
        .collect_vec();
    for consumer in consumers.iter_mut() {
        consumer.start();
    }
    consumers
}

fn main() {
    let consumer_count = 8;
    let buffers = setup_buffers(3, BufferConfig::default());

    println!("Seeding each buffer with one ordinary message from 5 producers");
    let mut seeders = (0..5)
        .map(|i| Producer::seed(format!("seed-{i}"), buffers.clone(), LetterSource))
        .collect_vec();
    for producer in seeders.iter_mut() {
        producer.start();
    }
    for producer in seeders.iter_mut() {
        producer.join().unwrap();
    }

    let mut consumers = start_consumers(consumer_count, &buffers);
    thread::sleep(Duration::from_secs(2));

    println!("Broadcasting one special message, evicted after 3 reads");
    let mut special = Producer::new(
        "special-0".to_string(),
        buffers.clone(),
        LetterSource,
        ProducerMode::Special,
        Duration::from_secs(1),
    );
    special.start();
    thread::sleep(Duration::from_secs(1));
    special.stop();
    special.join().unwrap();
    thread::sleep(Duration::from_secs(3));

    println!("Mixed traffic, one special message in four cycles");
    let mut producers = (0..5)
        .map(|i| {
            Producer::new(
                format!("mixed-{i}"),
                buffers.clone(),
                LetterSource,
                ProducerMode::mixed_default(),
                Duration::from_secs(1),
            )
        })
        .collect_vec();
    for producer in producers.iter_mut() {
        producer.start();
    }
    thread::sleep(Duration::from_secs(5));

    for producer in producers.iter_mut() {
        producer.stop();
    }
    for producer in producers.iter_mut() {
        producer.join().unwrap();
    }
    for consumer in consumers.iter_mut() {
        consumer.stop();
    }
    for consumer in consumers.iter_mut() {
        consumer.join().unwrap();
    }

    println!("Quorum run: one buffer, special evicted once every consumer acknowledged");
    let quorum_config = BufferConfig::default().with_policy(EvictionPolicy::Quorum {
        quorum: consumer_count,
    });
    let quorum_buffers = setup_buffers(1, quorum_config);

    let mut special = Producer::new(
        "special-1".to_string(),
        quorum_buffers.clone(),
        LetterSource,
        ProducerMode::Special,
        Duration::from_secs(1),
    );
    special.start();
    thread::sleep(Duration::from_secs(1));
    special.stop();
    special.join().unwrap();

    let mut consumers = start_consumers(consumer_count, &quorum_buffers);
    thread::sleep(Duration::from_secs(3));

    for consumer in consumers.iter_mut() {
        consumer.stop();
    }
    for consumer in consumers.iter_mut() {
        consumer.join().unwrap();
    }

    println!(
        "Done, {} special messages still pending",
        quorum_buffers[0].pending_special_len()
    );
}
