//! Callback channels shared between the compositor and its host.
//!
//! [`Emitter`] is a single named channel: subscribers register boxed
//! callbacks and receive every emitted value in registration order. The
//! callback list is snapshotted before dispatch, so a handler may freely
//! subscribe or unsubscribe while a dispatch is in flight. Handlers run to
//! completion one after another; there is no queueing and no threading.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Registry<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

/// A single event channel with interior-shared subscriber state.
///
/// Cloning an `Emitter` clones a handle to the same channel.
pub struct Emitter<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.registry.borrow().entries.len())
            .finish()
    }
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Invokes every current subscriber with `event`, in registration order.
    ///
    /// A handler unsubscribed by an earlier handler of the same dispatch
    /// still sees this dispatch; it stops receiving from the next one.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            (callback.borrow_mut())(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().entries.len()
    }
}

impl<E: 'static> Emitter<E> {
    /// Registers `callback` and returns its unsubscribe handle.
    pub fn on(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .entries
                .push((id, Rc::new(RefCell::new(callback))));
            id
        };

        let weak = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }
}

/// Owned unsubscribe handle returned by [`Emitter::on`].
///
/// Unsubscribes exactly once: either on an explicit [`unsubscribe`] call or
/// when dropped, whichever comes first. Outliving the emitter is fine; the
/// release then becomes a no-op.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
