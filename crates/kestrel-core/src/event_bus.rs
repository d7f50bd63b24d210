//! Typed publish/subscribe channel.
//!
//! External collaborators publish events (for example "a push notification
//! arrived") with [`EventBus::emit`]; interested parties call
//! [`EventBus::register`] and consume the returned [`EventStream`].
//!
//! Each registration owns its own unbounded queue, so a slow consumer never
//! drops events for the others. Unregistering closes that queue: the stream
//! drains what was already delivered and then ends. Unregistering an unknown
//! or already-removed registration is a no-op, as is emitting with nobody
//! registered.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Marker for types that can travel over the bus.
pub trait Event: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Event for T {}

/// Identifies one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration-{}", self.0)
    }
}

struct Registration {
    id: RegistrationId,
    sender: Box<dyn Any + Send + Sync>,
}

/// Stream of events of one type, produced by [`EventBus::register`].
pub struct EventStream<E> {
    id: RegistrationId,
    inner: UnboundedReceiverStream<E>,
}

impl<E> EventStream<E> {
    /// Handle to pass back to [`EventBus::unregister`].
    pub fn id(&self) -> RegistrationId {
        self.id
    }
}

impl<E> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").field("id", &self.id).finish()
    }
}

/// Typed event bus keyed by event type.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    registrations: Mutex<HashMap<TypeId, Vec<Registration>>>,
}

impl EventBus {
    /// Bus with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new registration for events of type `E`.
    pub fn register<E: Event>(&self) -> EventStream<E> {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel::<E>();
        self.registrations
            .lock()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Registration {
                id,
                sender: Box::new(tx),
            });
        tracing::debug!(%id, event = std::any::type_name::<E>(), "event registration opened");
        EventStream {
            id,
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// Close a registration. Returns `false` if it was already gone.
    pub fn unregister<E: Event>(&self, id: RegistrationId) -> bool {
        let mut registrations = self.registrations.lock();
        let Some(entries) = registrations.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|r| r.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            registrations.remove(&TypeId::of::<E>());
        }
        if removed {
            tracing::debug!(%id, event = std::any::type_name::<E>(), "event registration closed");
        }
        removed
    }

    /// Publish `event` to every live registration of its type.
    ///
    /// Returns the number of registrations the event was delivered to.
    pub fn emit<E: Event>(&self, event: E) -> usize {
        let mut registrations = self.registrations.lock();
        let Some(entries) = registrations.get_mut(&TypeId::of::<E>()) else {
            return 0;
        };
        let mut delivered = 0;
        entries.retain(|r| match r.sender.downcast_ref::<mpsc::UnboundedSender<E>>() {
            Some(tx) => {
                let open = tx.send(event.clone()).is_ok();
                if open {
                    delivered += 1;
                }
                open
            }
            None => false,
        });
        delivered
    }

    /// Number of open registrations for `E`.
    pub fn registrations<E: Event>(&self) -> usize {
        self.registrations
            .lock()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registrations = self.registrations.lock();
        f.debug_struct("EventBus")
            .field("event_types", &registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Pong;

    #[tokio::test]
    async fn emit_reaches_registered_stream() {
        let bus = EventBus::new();
        let mut stream = bus.register::<Ping>();

        assert_eq!(bus.emit(Ping(1)), 1);
        assert_eq!(stream.next().await, Some(Ping(1)));
    }

    #[test]
    fn emit_without_registrations_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(Ping(1)), 0);
    }

    #[tokio::test]
    async fn event_types_are_isolated() {
        let bus = EventBus::new();
        let _pings = bus.register::<Ping>();

        assert_eq!(bus.emit(Pong), 0);
        assert_eq!(bus.registrations::<Ping>(), 1);
        assert_eq!(bus.registrations::<Pong>(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent_and_ends_stream() {
        let bus = EventBus::new();
        let mut stream = bus.register::<Ping>();
        let id = stream.id();

        assert!(bus.unregister::<Ping>(id));
        assert!(!bus.unregister::<Ping>(id));
        assert_eq!(bus.emit(Ping(2)), 0);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn dropped_stream_is_pruned_on_emit() {
        let bus = EventBus::new();
        let stream = bus.register::<Ping>();
        drop(stream);

        assert_eq!(bus.emit(Ping(3)), 0);
        assert_eq!(bus.registrations::<Ping>(), 0);
    }
}
