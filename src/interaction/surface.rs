//! Global pointer listeners as a scoped resource.
//!
//! While a drag is in progress the controller listens on the whole input
//! surface rather than the dragged element, so a fast drag that leaves the
//! element is not lost. The listener is held as a [`ListenerLease`]: taken
//! when the drag starts and released when the lease is dropped, which
//! happens on pointer-up, on teardown and if the controller itself goes
//! away.

use std::cell::Cell;
use std::rc::Rc;

/// Handle for one attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The host's global pointer surface.
pub trait PointerSurface {
    fn attach(&self) -> ListenerId;
    fn detach(&self, id: ListenerId);
}

/// An attached listener. Detaches on drop.
pub struct ListenerLease {
    surface: Rc<dyn PointerSurface>,
    id: ListenerId,
}

impl ListenerLease {
    pub fn acquire(surface: &Rc<dyn PointerSurface>) -> Self {
        let id = surface.attach();
        Self {
            surface: Rc::clone(surface),
            id,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerLease {
    fn drop(&mut self) {
        self.surface.detach(self.id);
    }
}

impl std::fmt::Debug for ListenerLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ListenerLease").field(&self.id.0).finish()
    }
}

/// Surface that only keeps count of attached listeners.
///
/// Useful for hosts without a real event target (exports, tests) and for
/// asserting that no listener outlives its drag.
#[derive(Debug, Default)]
pub struct CountingSurface {
    next: Cell<u64>,
    active: Cell<usize>,
    attached_total: Cell<usize>,
}

impl CountingSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Listeners currently attached.
    pub fn active(&self) -> usize {
        self.active.get()
    }

    /// Listeners ever attached.
    pub fn attached_total(&self) -> usize {
        self.attached_total.get()
    }
}

impl PointerSurface for CountingSurface {
    fn attach(&self) -> ListenerId {
        let id = self.next.get();
        self.next.set(id + 1);
        self.active.set(self.active.get() + 1);
        self.attached_total.set(self.attached_total.get() + 1);
        ListenerId(id)
    }

    fn detach(&self, _id: ListenerId) {
        self.active.set(self.active.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_detaches_on_drop() {
        let counter = CountingSurface::new();
        let surface: Rc<dyn PointerSurface> = counter.clone();
        {
            let lease = ListenerLease::acquire(&surface);
            assert_eq!(lease.id(), ListenerId(0));
            assert_eq!(counter.active(), 1);
        }
        assert_eq!(counter.active(), 0);
        assert_eq!(counter.attached_total(), 1);
    }
}
