//! # Event Bus
//!
//! Chips that must react to each other's state changes talk through events
//! instead of holding references to each other.
//!
//! - A [`Notifier`] is owned by the emitting chip. [`Notifier::notify`] calls
//!   every subscriber synchronously, in subscription order, before returning.
//! - [`Notifier::subscribe`] returns a [`Subscription`]. Dropping the handle
//!   unsubscribes; nothing has to remove itself by hand.
//! - An [`EventQueue`] is a ready-made subscriber that buffers events, for a chip
//!   that wants to process them inside its own next `simulate`.
//!
//! Handlers must not re-enter the emitting chip. Emitting from inside a
//! handler of the same notifier is not supported.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Something that happened inside a chip.
///
/// Ids are small integers namespaced per chip family.
#[derive(Clone)]
pub struct Event {
    pub id: u32,
    pub value: i64,
    pub data: Option<Rc<dyn Any>>,
}

impl Event {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            value: 0,
            data: None,
        }
    }

    pub fn with_value(id: u32, value: i64) -> Self {
        Self {
            id,
            value,
            data: None,
        }
    }

    /// Attaches opaque shared data.
    pub fn with_data(mut self, data: Rc<dyn Any>) -> Self {
        self.data = Some(data);
        self
    }

    /// Downcasts the attached data.
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("value", &self.value)
            .field("data", &self.data.is_some())
            .finish()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.value == other.value
            && match (&self.data, &other.data) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

type Handler = Box<dyn FnMut(&Event)>;

#[derive(Default)]
struct Subscribers {
    next_key: u64,
    handlers: Vec<(u64, Handler)>,
    notifying: bool,
    dropped: Vec<u64>,
}

/// The emitting side of the bus.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use lib8bit::{Event, Notifier};
///
/// let notifier = Notifier::new();
/// let seen = Rc::new(Cell::new(0));
///
/// let sink = Rc::clone(&seen);
/// let handle = notifier.subscribe(move |e: &Event| sink.set(e.value));
///
/// notifier.notify(&Event::with_value(1, 42));
/// assert_eq!(seen.get(), 42);
///
/// drop(handle);
/// notifier.notify(&Event::with_value(1, 7));
/// assert_eq!(seen.get(), 42);
/// ```
#[derive(Clone, Default)]
pub struct Notifier {
    subscribers: Rc<RefCell<Subscribers>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. It stays registered while the returned handle lives.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&Event) + 'static,
    {
        let mut subs = self.subscribers.borrow_mut();
        let key = subs.next_key;
        subs.next_key += 1;
        subs.handlers.push((key, Box::new(handler)));
        Subscription {
            key,
            subscribers: Rc::downgrade(&self.subscribers),
        }
    }

    /// Delivers `event` to every subscriber in subscription order.
    pub fn notify(&self, event: &Event) {
        // Handlers are taken out while they run so one may drop a subscription
        // without a double borrow.
        let mut running = {
            let mut subs = self.subscribers.borrow_mut();
            subs.notifying = true;
            std::mem::take(&mut subs.handlers)
        };
        for (_, handler) in running.iter_mut() {
            handler(event);
        }
        let mut subs = self.subscribers.borrow_mut();
        let dropped = std::mem::take(&mut subs.dropped);
        running.retain(|(key, _)| !dropped.contains(key));
        let added = std::mem::take(&mut subs.handlers);
        running.extend(added);
        subs.handlers = running;
        subs.notifying = false;
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().handlers.len()
    }
}

/// Keeps a handler registered. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    key: u64,
    subscribers: Weak<RefCell<Subscribers>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subs) = self.subscribers.upgrade() {
            if let Ok(mut subs) = subs.try_borrow_mut() {
                subs.handlers.retain(|(key, _)| *key != self.key);
                if subs.notifying {
                    subs.dropped.push(self.key);
                }
            }
        }
    }
}

/// A subscriber that buffers events for later processing.
///
/// # Examples
///
/// ```
/// use lib8bit::{Event, EventQueue, Notifier};
///
/// let notifier = Notifier::new();
/// let queue = EventQueue::new();
/// let _sub = queue.listen(&notifier);
///
/// notifier.notify(&Event::with_value(3, 1));
/// assert_eq!(queue.drain().len(), 1);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<Event>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the queue to a notifier.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn listen(&self, notifier: &Notifier) -> Subscription {
        let events = Rc::clone(&self.events);
        notifier.subscribe(move |e: &Event| events.borrow_mut().push_back(e.clone()))
    }

    pub fn push(&self, event: Event) {
        self.events.borrow_mut().push_back(event);
    }

    /// Removes and returns every buffered event, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delivery_in_subscription_order() {
        let notifier = Notifier::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let _a = notifier.subscribe(move |_: &Event| first.borrow_mut().push("a"));
        let _b = notifier.subscribe(move |_: &Event| second.borrow_mut().push("b"));
        notifier.notify(&Event::new(0));
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_handler_may_drop_its_subscription() {
        let notifier = Notifier::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let inner_slot = Rc::clone(&slot);
        let inner_calls = Rc::clone(&calls);
        let sub = notifier.subscribe(move |_: &Event| {
            inner_calls.set(inner_calls.get() + 1);
            inner_slot.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);

        notifier.notify(&Event::new(1));
        notifier.notify(&Event::new(1));
        assert_eq!(calls.get(), 1);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_event_data_downcast() {
        let event = Event::with_value(2, 5).with_data(Rc::new(String::from("motor")));
        assert_eq!(event.data::<String>().map(String::as_str), Some("motor"));
        assert!(event.data::<u32>().is_none());
    }
}
