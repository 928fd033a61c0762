//! Change notification plumbing.
//!
//! Every observable piece of the model owns one or more [`ListenerSet`]s.
//! Listeners are plain closures; a subscription is identified by the
//! [`ListenerId`] returned from [`ListenerSet::subscribe`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies a subscription inside a [`ListenerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// A set of event listeners for a single event type.
///
/// Emission works on a snapshot of the current listeners, so callbacks may
/// freely subscribe or unsubscribe (including themselves) while an event is
/// being delivered. A listener removed during an emission is not called for
/// the remainder of that emission.
pub struct ListenerSet<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
}

impl<E> ListenerSet<E> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Registers a listener and returns its subscription id.
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Delivers `event` to every registered listener in subscription order.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<(ListenerId, Listener<E>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            if self.contains(id) {
                listener(event);
            }
        }
    }

    /// Returns `true` if the subscription is still registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(existing, _)| *existing == id)
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Returns `true` if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
