//! Topic bus
//!
//! Every subscription owns a bounded queue and a delivery thread. Publishing
//! never blocks: a full queue drops its oldest message (KeepLast retention),
//! which is where the node's buffering cap lives.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use async_channel::{bounded, Receiver, Sender};
use contracts::TopicName;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace};

use crate::error::{Result, TransportError};

/// Subscription quality of service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qos {
    /// KeepLast history depth
    pub depth: usize,
}

impl Qos {
    pub fn keep_last(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
        }
    }
}

struct TopicEntry {
    type_id: TypeId,
    type_name: &'static str,
    subscribers: usize,
    /// `Vec<Sender<M>>` for the topic's message type
    senders: Box<dyn Any + Send + Sync>,
}

/// In-process publish/subscribe bus
pub struct Bus {
    topics: RwLock<HashMap<TopicName, TopicEntry>>,
    closers: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            closers: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Register `handler` for every message published on `topic`
    ///
    /// The handler runs on a dedicated thread, one message at a time, in
    /// publish order.
    #[instrument(
        name = "bus_subscribe",
        skip(self, topic, handler),
        fields(topic = tracing::field::Empty, depth = qos.depth)
    )]
    pub fn subscribe<M, F>(&self, topic: impl Into<TopicName>, qos: Qos, handler: F) -> Result<()>
    where
        M: Send + 'static,
        F: Fn(M) + Send + 'static,
    {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let topic = topic.into();
        tracing::Span::current().record("topic", topic.as_str());

        let (tx, rx) = bounded::<M>(qos.depth);
        self.add_sender(&topic, tx.clone())?;

        let handle = Self::spawn_delivery(&topic, rx, handler)?;
        self.threads.lock().push(handle);
        self.closers.lock().push(Box::new(move || {
            tx.close();
        }));

        debug!(topic = %topic, "subscription registered");
        Ok(())
    }

    /// Publish `msg` to every subscriber of `topic`
    ///
    /// Returns the number of subscriptions the message was queued on.
    /// Publishing on a topic nobody subscribed to is a no-op.
    pub fn publish<M>(&self, topic: &str, msg: M) -> Result<usize>
    where
        M: Clone + Send + 'static,
    {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let topics = self.topics.read();
        let Some(entry) = topics.get(topic) else {
            trace!(topic, "no subscribers");
            return Ok(0);
        };
        let senders = Self::downcast_senders::<M>(topic, entry)?;

        let mut delivered = 0;
        for tx in senders {
            match tx.force_send(msg.clone()) {
                Ok(Some(_displaced)) => {
                    delivered += 1;
                    metrics::counter!(
                        "vins_transport_messages_displaced_total",
                        "topic" => topic.to_string()
                    )
                    .increment(1);
                }
                Ok(None) => delivered += 1,
                Err(_) => {}
            }
        }

        metrics::counter!("vins_transport_messages_published_total", "topic" => topic.to_string())
            .increment(1);
        Ok(delivered)
    }

    /// Number of subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close every queue and join the delivery threads
    ///
    /// Messages already queued are still delivered before the threads exit.
    #[instrument(name = "bus_shutdown", skip(self))]
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        for close in self.closers.lock().drain(..) {
            close();
        }

        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        let count = threads.len();
        for handle in threads {
            let _ = handle.join();
        }
        info!(threads = count, "bus shut down");
    }

    fn add_sender<M: Send + 'static>(&self, topic: &TopicName, tx: Sender<M>) -> Result<()> {
        let mut topics = self.topics.write();
        let entry = topics.entry(topic.clone()).or_insert_with(|| TopicEntry {
            type_id: TypeId::of::<M>(),
            type_name: type_name::<M>(),
            subscribers: 0,
            senders: Box::new(Vec::<Sender<M>>::new()),
        });

        let expected = entry.type_name;
        match entry.senders.downcast_mut::<Vec<Sender<M>>>() {
            Some(senders) => {
                senders.push(tx);
                entry.subscribers += 1;
                Ok(())
            }
            None => Err(TransportError::TypeMismatch {
                topic: topic.to_string(),
                expected,
                found: type_name::<M>(),
            }),
        }
    }

    fn downcast_senders<'a, M: 'static>(
        topic: &str,
        entry: &'a TopicEntry,
    ) -> Result<&'a Vec<Sender<M>>> {
        if entry.type_id != TypeId::of::<M>() {
            return Err(TransportError::TypeMismatch {
                topic: topic.to_string(),
                expected: entry.type_name,
                found: type_name::<M>(),
            });
        }
        entry
            .senders
            .downcast_ref::<Vec<Sender<M>>>()
            .ok_or_else(|| TransportError::TypeMismatch {
                topic: topic.to_string(),
                expected: entry.type_name,
                found: type_name::<M>(),
            })
    }

    fn spawn_delivery<M, F>(topic: &TopicName, rx: Receiver<M>, handler: F) -> Result<JoinHandle<()>>
    where
        M: Send + 'static,
        F: Fn(M) + Send + 'static,
    {
        let thread_topic = topic.clone();
        thread::Builder::new()
            .name(format!("sub{}", topic.as_str().replace('/', ":")))
            .spawn(move || {
                debug!(topic = %thread_topic, "delivery thread started");
                while let Ok(msg) = rx.recv_blocking() {
                    handler(msg);
                }
                debug!(topic = %thread_topic, "delivery thread finished");
            })
            .map_err(|source| TransportError::Spawn {
                topic: topic.to_string(),
                source,
            })
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        self.shutdown();
    }
}
