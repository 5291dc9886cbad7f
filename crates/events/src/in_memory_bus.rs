//! Single-process event bus.
//!
//! The whole engine runs in one address space, so fan-out is a channel send
//! per subscriber: committed rental and inventory events go out as JSON
//! envelopes to the projections and the notification relay.

use std::convert::Infallible;
use std::sync::{Mutex, mpsc};

use serde_json::Value as JsonValue;

use crate::bus::{EventBus, Subscription};
use crate::envelope::EventEnvelope;

/// The envelope bus shared by the dispatcher, projections, and relay workers.
pub type JsonEnvelopeBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Broadcast bus backed by std `mpsc` channels.
///
/// Delivery is at-least-once; consumers stay idempotent. Subscribers whose
/// receiving end has been dropped are pruned on the next publish, so a dead
/// worker never wedges the senders.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = Infallible;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        // The subscriber list is just channel handles; nothing behind the
        // lock can be left torn, so a poisoned lock is recovered rather than
        // wedging every later publish.
        let mut subs = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }

        Subscription::new(rx)
    }
}
