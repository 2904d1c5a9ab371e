//! Run-time observation hooks.
//!
//! See `spec.md` §6's observer interface: a single trait fired
//! synchronously on the calling thread. An observer that panics
//! propagates its panic through the runner unchanged — the framework
//! does not catch or mask observer failures.

/// A lifecycle or progress event a runner, kicker, or solver fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A run is about to begin.
    Start,
    /// A strictly better state than any seen so far was found.
    NewBest,
    /// A move was committed to the current state.
    StoreMove,
    /// A run has finished (converged, exhausted its budget, or was cancelled).
    End,
    /// One round of a multi-round runner (e.g. token-ring) completed.
    Round,
    /// A runner's `run` was entered.
    RunnerStart,
    /// A runner's `run` returned.
    RunnerStop,
    /// A kicker's perturbation sequence began.
    KickerStart,
    /// One step of a kicker's perturbation sequence completed.
    KickStep,
    /// A kicker's perturbation sequence finished.
    KickerStop,
}

/// Receives [`Event`]s fired by runners, kickers, and solvers.
///
/// Dispatch is synchronous, fire-and-forget: the caller does not
/// inspect a return value and a panicking observer aborts the run the
/// same way any other panic would.
pub trait Observer: Send + Sync {
    /// Called for every event the owning runner/kicker/solver fires.
    fn on_event(&self, event: Event);
}

/// An observer that discards every event.
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: Event) {}
}

/// Dispatches one event to every registered observer, in order.
pub fn notify_all(observers: &[&dyn Observer], event: Event) {
    for observer in observers {
        observer.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingObserver {
        seen: RefCell<Vec<Event>>,
    }

    impl Observer for RecordingObserver {
        fn on_event(&self, event: Event) {
            self.seen.borrow_mut().push(event);
        }
    }

    #[test]
    fn notify_all_reaches_every_observer_in_order() {
        let a = RecordingObserver {
            seen: RefCell::new(Vec::new()),
        };
        let b = RecordingObserver {
            seen: RefCell::new(Vec::new()),
        };
        let observers: Vec<&dyn Observer> = vec![&a, &b];
        notify_all(&observers, Event::Start);
        notify_all(&observers, Event::NewBest);

        assert_eq!(*a.seen.borrow(), vec![Event::Start, Event::NewBest]);
        assert_eq!(*b.seen.borrow(), vec![Event::Start, Event::NewBest]);
    }

    #[test]
    #[should_panic]
    fn panicking_observer_propagates() {
        struct PanicObserver;
        impl Observer for PanicObserver {
            fn on_event(&self, _event: Event) {
                panic!("observer failure propagates");
            }
        }
        let observers: Vec<&dyn Observer> = vec![&PanicObserver];
        notify_all(&observers, Event::Start);
    }
}
