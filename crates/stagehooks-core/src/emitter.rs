use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::error::panic_message;

/// A dynamically typed registry value. Typed handles downcast it.
pub type Value = Rc<dyn Any>;

/// Registry-level change callback: `(new, old)`. `old` is `None` only for
/// stores that notify on the first write of a key.
pub type Listener = Rc<dyn Fn(&Value, Option<&Value>)>;

new_key_type! {
    /// Identifies one registered listener across every event of an emitter.
    pub struct ListenerId;
}

struct Entry {
    event: String,
    callback: Listener,
    once: bool,
}

#[derive(Default)]
struct Inner {
    listeners: SlotMap<ListenerId, Entry>,
    // event -> listener ids in registration order
    order: HashMap<String, SmallVec<[ListenerId; 4]>>,
}

/// String-keyed event channels with FIFO delivery.
///
/// Delivery works on a snapshot taken when `emit` starts, so listeners may
/// subscribe or unsubscribe from inside a callback. A panicking listener is
/// logged and the remaining listeners still run.
#[derive(Default)]
pub struct EventEmitter {
    inner: RefCell<Inner>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, callback: Listener) -> ListenerId {
        self.add(event, callback, false)
    }

    pub fn once(&self, event: &str, callback: Listener) -> ListenerId {
        self.add(event, callback, true)
    }

    fn add(&self, event: &str, callback: Listener, once: bool) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.listeners.insert(Entry {
            event: event.to_string(),
            callback,
            once,
        });
        inner.order.entry(event.to_string()).or_default().push(id);
        id
    }

    /// Removes one listener. Returns `false` if it was not registered for `event`.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.listeners.get(id) {
            Some(entry) if entry.event == event => {}
            _ => return false,
        }
        inner.listeners.remove(id);
        if let Some(ids) = inner.order.get_mut(event) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                inner.order.remove(event);
            }
        }
        true
    }

    pub fn remove_all(&self, event: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(ids) = inner.order.remove(event) {
            for id in ids {
                inner.listeners.remove(id);
            }
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.borrow().order.get(event).map_or(0, |ids| ids.len())
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.listeners.clear();
        inner.order.clear();
    }

    /// Synchronously delivers `(new, old)` to every listener of `event`.
    /// Returns how many listeners were invoked.
    pub fn emit(&self, event: &str, new: &Value, old: Option<&Value>) -> usize {
        let snapshot: Vec<Listener> = {
            let mut inner = self.inner.borrow_mut();
            let Some(ids) = inner.order.get(event).cloned() else {
                return 0;
            };
            let mut out = Vec::with_capacity(ids.len());
            let mut fired_once = SmallVec::<[ListenerId; 4]>::new();
            for id in ids {
                if let Some(entry) = inner.listeners.get(id) {
                    out.push(entry.callback.clone());
                    if entry.once {
                        fired_once.push(id);
                    }
                }
            }
            for id in fired_once {
                inner.listeners.remove(id);
                if let Some(ids) = inner.order.get_mut(event) {
                    ids.retain(|other| *other != id);
                }
            }
            if inner.order.get(event).is_some_and(|ids| ids.is_empty()) {
                inner.order.remove(event);
            }
            out
        };

        for callback in &snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(new, old))) {
                log::error!(
                    target: "stagehooks",
                    "listener for '{event}' panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        snapshot.len()
    }
}
