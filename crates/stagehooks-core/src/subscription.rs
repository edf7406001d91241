use std::cell::RefCell;
use std::rc::Rc;

use crate::emitter::ListenerId;

/// Unsubscribe handle returned by `on` / `once`.
///
/// Dropping it keeps the listener registered; call [`Subscription::unsubscribe`]
/// or pass [`Subscription::id`] to `off`.
#[derive(Clone)]
pub struct Subscription {
    id: ListenerId,
    dispose: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Subscription {
    pub fn new(id: ListenerId, dispose: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            dispose: Rc::new(RefCell::new(Some(Box::new(dispose)))),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Runs at most once (safe to call multiple times, from any clone).
    pub fn unsubscribe(&self) {
        let dispose = self.dispose.borrow_mut().take();
        if let Some(f) = dispose {
            f()
        }
    }

    /// `false` once `unsubscribe` has run. Removal through `off` or
    /// `clear_listeners` is not tracked here.
    pub fn is_active(&self) -> bool {
        self.dispose.borrow().is_some()
    }
}
