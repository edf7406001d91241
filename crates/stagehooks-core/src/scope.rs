use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A teardown list bound to the lifetime of a scene.
///
/// Wrappers that attach listeners or timers outside their own key register a
/// disposer here so nothing outlives the scene that created it.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a teardown callback. On an already disposed scope the
    /// callback runs immediately.
    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Runs disposers in registration order. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let disposers = std::mem::take(&mut *self.inner.disposers.borrow_mut());
        for disposer in disposers {
            disposer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_runs_once_in_order() {
        let scope = Scope::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            scope.add_disposer(move || log.borrow_mut().push(i));
        }

        scope.dispose();
        scope.dispose();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);

        let late = log.clone();
        scope.add_disposer(move || late.borrow_mut().push(9));
        assert_eq!(*log.borrow(), vec![0, 1, 2, 9]);
        assert!(scope.is_disposed());
    }
}
