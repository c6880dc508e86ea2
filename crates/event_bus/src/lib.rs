//! Synchronous named-event bus with optional bubbling to a second bus.
//!
//! Components hold an [`EventBus`] by composition and talk to each other through event names
//! instead of direct calls. A listener may name a forward target; after its callback runs, the
//! event is re-dispatched on that target. Each dispatch chain tracks the buses it has passed
//! through, so a forwarding loop between buses is reported instead of recursing.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

use leptos::logging;
use thiserror::Error;

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique bus identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(pub u64);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque registration token used to unsubscribe a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionToken(pub u64);

/// Callback invoked for each delivered event.
pub type BarkCallback<P> = Rc<dyn Fn(&Bark<P>)>;

/// One delivered event.
#[derive(Debug)]
pub struct Bark<P> {
    name: String,
    source: BusId,
    payload: P,
    bubbles: Cell<bool>,
}

impl<P> Bark<P> {
    fn new(name: &str, source: BusId, payload: P) -> Self {
        Self {
            name: name.to_string(),
            source,
            payload,
            bubbles: Cell::new(true),
        }
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus the event is being delivered on.
    pub fn source(&self) -> BusId {
        self.source
    }

    /// Event payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Whether the event will still be forwarded after this callback.
    pub fn bubbles(&self) -> bool {
        self.bubbles.get()
    }

    /// Keeps the current listener from forwarding this event.
    pub fn stop_propagation(&self) {
        self.bubbles.set(false);
    }
}

/// Bus registration and forwarding failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A listener tried to forward events to the bus it is registered on.
    #[error("bus {bus} cannot forward `{event}` to itself")]
    SelfForward {
        /// Bus the registration was attempted on.
        bus: BusId,
        /// Event name.
        event: String,
    },
    /// Forwarding would re-enter a bus that is already dispatching this chain.
    #[error("bubbling `{event}` from bus {from} to bus {to} would form a cycle")]
    BubbleCycle {
        /// Event name.
        event: String,
        /// Bus doing the forwarding.
        from: BusId,
        /// Bus already on the dispatch path.
        to: BusId,
    },
    /// The forward target no longer exists.
    #[error("forward target for `{event}` on bus {from} was dropped")]
    ForwardTargetDropped {
        /// Event name.
        event: String,
        /// Bus doing the forwarding.
        from: BusId,
    },
}

struct Listener<P> {
    token: SubscriptionToken,
    callback: Option<BarkCallback<P>>,
    forward: Option<Weak<EventBus<P>>>,
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            callback: self.callback.clone(),
            forward: self.forward.clone(),
        }
    }
}

/// Named-event registry with synchronous, reentrant dispatch.
pub struct EventBus<P> {
    id: BusId,
    next_token: Cell<u64>,
    listeners: RefCell<HashMap<String, Vec<Listener<P>>>>,
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_struct("EventBus")
            .field("id", &self.id)
            .field("events", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<P: Clone + 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + 'static> EventBus<P> {
    /// Creates an empty bus with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: BusId(NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed)),
            next_token: Cell::new(0),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Returns this bus identity.
    pub fn id(&self) -> BusId {
        self.id
    }

    /// Registers `callback` for `event`, optionally forwarding each delivery to `forward_target`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::SelfForward`] when `forward_target` is this bus. Nothing is registered
    /// in that case.
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        callback: impl Fn(&Bark<P>) + 'static,
        forward_target: Option<&Rc<EventBus<P>>>,
    ) -> Result<SubscriptionToken, BusError> {
        self.register(event.into(), Some(Rc::new(callback)), forward_target)
    }

    /// Forwards every `event` delivered on this bus to `target` without a local callback.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::SelfForward`] when `target` is this bus.
    pub fn bubble(
        &self,
        event: impl Into<String>,
        target: &Rc<EventBus<P>>,
    ) -> Result<SubscriptionToken, BusError> {
        self.register(event.into(), None, Some(target))
    }

    /// Removes a listener. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let mut listeners = self.listeners.borrow_mut();
        for entries in listeners.values_mut() {
            entries.retain(|listener| listener.token != token);
        }
        listeners.retain(|_, entries| !entries.is_empty());
    }

    /// Returns how many listeners are registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every listener of `event` in registration order.
    ///
    /// Forwarding happens right after the forwarding listener's callback, before the next
    /// listener runs. Dispatching an event nobody listens to does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first forwarding failure ([`BusError::BubbleCycle`] or
    /// [`BusError::ForwardTargetDropped`]). Remaining listeners still run.
    pub fn dispatch(&self, event: &str, payload: P) -> Result<(), BusError> {
        let mut path = vec![self.id];
        self.dispatch_along(event, payload, &mut path)
    }

    fn register(
        &self,
        event: String,
        callback: Option<BarkCallback<P>>,
        forward_target: Option<&Rc<EventBus<P>>>,
    ) -> Result<SubscriptionToken, BusError> {
        if forward_target.is_some_and(|target| target.id == self.id) {
            return Err(BusError::SelfForward { bus: self.id, event });
        }

        let next = self.next_token.get().saturating_add(1);
        self.next_token.set(next);
        let token = SubscriptionToken(next);
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Listener {
                token,
                callback,
                forward: forward_target.map(Rc::downgrade),
            });
        Ok(token)
    }

    fn dispatch_along(
        &self,
        event: &str,
        payload: P,
        path: &mut Vec<BusId>,
    ) -> Result<(), BusError> {
        // Snapshot so callbacks can subscribe or dispatch without hitting a live borrow.
        let listeners = self
            .listeners
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default();
        let mut first_error = None;

        for listener in listeners {
            let bark = Bark::new(event, self.id, payload.clone());
            if let Some(callback) = listener.callback.as_ref() {
                callback(&bark);
            }
            let Some(target) = listener.forward.as_ref() else {
                continue;
            };
            if !bark.bubbles() {
                continue;
            }

            let result = match target.upgrade() {
                None => {
                    let err = BusError::ForwardTargetDropped {
                        event: event.to_string(),
                        from: self.id,
                    };
                    logging::warn!("{err}");
                    Err(err)
                }
                Some(target) if path.contains(&target.id) => {
                    let err = BusError::BubbleCycle {
                        event: event.to_string(),
                        from: self.id,
                        to: target.id,
                    };
                    logging::warn!("{err}");
                    Err(err)
                }
                Some(target) => {
                    path.push(target.id);
                    let result = target.dispatch_along(event, payload.clone(), path);
                    path.pop();
                    result
                }
            };
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
