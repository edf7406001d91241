use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::error::panic_message;

pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    t: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            t: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}

new_key_type! {
    pub struct TimerId;
}

/// The host's fire-once deferred callback facility.
pub trait TimerHost {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;
    /// Returns `false` if the timer already fired or was cancelled.
    fn cancel(&self, id: TimerId) -> bool;
    /// `true` while `id` is waiting to fire.
    fn is_scheduled(&self, id: TimerId) -> bool;
}

struct Timer {
    due: Instant,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Timers {
    entries: SlotMap<TimerId, Timer>,
    next_seq: u64,
}

/// Timer queue driven by the host loop: call [`TimerQueue::update`] once per
/// frame and every due callback runs, earliest first.
pub struct TimerQueue {
    clock: Box<dyn Clock>,
    timers: RefCell<Timers>,
}

impl TimerQueue {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            timers: RefCell::new(Timers::default()),
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn pending(&self) -> usize {
        self.timers.borrow().entries.len()
    }

    pub fn clear(&self) {
        self.timers.borrow_mut().entries.clear();
    }

    /// Fires every timer that was due when the call started. Timers scheduled
    /// by those callbacks wait for the next update. Returns how many fired.
    pub fn update(&self) -> usize {
        let now = self.clock.now();
        let mut due: Vec<(Instant, u64, TimerId)> = self
            .timers
            .borrow()
            .entries
            .iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(id, t)| (t.due, t.seq, id))
            .collect();
        due.sort_by_key(|(due, seq, _)| (*due, *seq));

        let mut fired = 0;
        for (_, _, id) in due {
            // an earlier callback may have cancelled this one
            let Some(timer) = self.timers.borrow_mut().entries.remove(id) else {
                continue;
            };
            fired += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(timer.callback)) {
                log::error!(
                    target: "stagehooks",
                    "timer callback panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        fired
    }
}

impl TimerHost for TimerQueue {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let due = self.clock.now() + delay;
        let mut timers = self.timers.borrow_mut();
        let seq = timers.next_seq;
        timers.next_seq += 1;
        timers.entries.insert(Timer { due, seq, callback })
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().entries.remove(id).is_some()
    }

    fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.borrow().entries.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order_once() {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(Box::new(clock.clone()));
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, ms) in [("late", 30u64), ("early", 10), ("mid", 20)] {
            let log = log.clone();
            queue.schedule(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push(name)),
            );
        }

        assert_eq!(queue.update(), 0);
        clock.advance(Duration::from_millis(25));
        assert_eq!(queue.update(), 2);
        assert_eq!(*log.borrow(), vec!["early", "mid"]);

        clock.advance(Duration::from_millis(10));
        queue.update();
        queue.update();
        assert_eq!(*log.borrow(), vec!["early", "mid", "late"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(Box::new(clock.clone()));
        let hit = Rc::new(Cell::new(false));

        let id = {
            let hit = hit.clone();
            queue.schedule(Duration::from_millis(5), Box::new(move || hit.set(true)))
        };
        assert!(queue.is_scheduled(id));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(!queue.is_scheduled(id));

        clock.advance(Duration::from_millis(50));
        queue.update();
        assert!(!hit.get());
    }
}
