// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Plain callback lists for change notification.
//!
//! Reads stay pull-based; observers are an optional push hook invoked
//! synchronously after local writes and admitted remote operations.

use crate::node::NodeId;

/// Where a change came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote(NodeId),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// An ordered list of callbacks receiving `&E`.
pub struct Observers<E> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Observers<E> {
        return Observers {
            next_id: 0,
            callbacks: Vec::new(),
        };
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        return id;
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(other, _)| *other != id);
        return self.callbacks.len() != before;
    }

    /// Invoke every callback in subscription order.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        return self.callbacks.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.callbacks.is_empty();
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Observers({})", self.callbacks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[test]
    fn notify_reaches_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers: Observers<u32> = Observers::new();

        let a = seen.clone();
        observers.subscribe(move |e| a.lock().unwrap().push(("a", *e)));
        let b = seen.clone();
        observers.subscribe(move |e| b.lock().unwrap().push(("b", *e)));

        observers.notify(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Arc::new(Mutex::new(0));
        let mut observers: Observers<()> = Observers::new();
        let c = count.clone();
        let id = observers.subscribe(move |_| *c.lock().unwrap() += 1);

        observers.notify(&());
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(observers.is_empty());
    }
}
