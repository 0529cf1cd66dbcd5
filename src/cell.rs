use std::any::Any;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};
use log::debug;
use crate::error::{Error, Result};




/// A typed listener on an [`Observable`]. Bindings and derived cells
/// implement this to be told about every new value stored in an upstream
/// cell.
pub trait Subscriber<T> {
    fn on_change(&self, value: &T) -> Result<()>;
}




/// Owns a subscription made with [`ReadCell::observe`]. The cell only holds
/// a weak reference to the listener, so dropping this guard unsubscribes it.
#[must_use = "the subscription is cancelled when this guard is dropped"]
pub struct Subscription {
    _link: Rc<dyn Any>,
}




struct FnSubscriber<F>(F);

impl<T, F> Subscriber<T> for FnSubscriber<F>
where
    F: Fn(&T) -> Result<()>,
{
    fn on_change(&self, value: &T) -> Result<()> {
        (self.0)(value)
    }
}




struct Inner<T> {
    label: String,
    value: RefCell<T>,
    subscribers: RefCell<Vec<Weak<dyn Subscriber<T>>>>,
}




/**
 * A read-only view of a cell: everything but `set`. Owners that must keep an
 * invariant over their cell's value (a frame index, a derived cell) hand out
 * this view so that only they can write to it.
 */
pub struct ReadCell<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for ReadCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}




// ============================================================================
impl<T: 'static> ReadCell<T> {

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Return a clone of the last stored value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Run a closure on a reference to the last stored value.
    pub fn with<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
        f(&self.inner.value.borrow())
    }

    /**
     * Invoke every live subscriber with the current value, in registration
     * order. All subscribers are run even when earlier ones fail. Listeners
     * registered while the cascade is in progress are not invoked until the
     * next one.
     */
    pub fn notify(&self) -> Result<()> {
        let subscribers: Vec<_> = {
            let mut list = self.inner.subscribers.borrow_mut();
            list.retain(|s| s.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        debug!("cell '{}' notifying {} subscriber(s)", self.inner.label, subscribers.len());

        let value = self.inner.value.borrow();
        let errors: Vec<_> = subscribers
            .iter()
            .filter_map(|s| s.on_change(&value).err())
            .collect();

        Error::join(errors)
    }

    /// Register a subscriber. The cell keeps a weak reference only: the
    /// caller owns the subscriber, and dropping it unsubscribes.
    pub fn subscribe<S: Subscriber<T> + 'static>(&self, subscriber: &Rc<S>) {
        let weak: Weak<S> = Rc::downgrade(subscriber);
        let weak: Weak<dyn Subscriber<T>> = weak;
        self.inner.subscribers.borrow_mut().push(weak)
    }

    /// Register a closure as a subscriber, returning the guard that owns it.
    pub fn observe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        let link = Rc::new(FnSubscriber(f));
        self.subscribe(&link);
        Subscription { _link: link }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }
}




/**
 * A mutable slot holding a value of type `T`, plus an ordered list of
 * subscribers. Storing a value runs a cascade: every live subscriber is
 * invoked, synchronously and in registration order, before `set` returns.
 * There is no deduplication of identical values, and no replay of the
 * current value to a newly registered subscriber.
 *
 * Cells are single-threaded shared handles; cloning an `Observable` gives
 * another writable handle onto the same slot, and [`Observable::view`] gives
 * a read-only one. Reading and subscribing go through the [`ReadCell`] the
 * observable derefs to. The cell graph must be acyclic: a subscriber that
 * sets the cell it is listening to gets an `Error::InvalidState` back rather
 * than a re-entrant cascade.
 */
pub struct Observable<T> {
    view: ReadCell<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
        }
    }
}

impl<T> Deref for Observable<T> {
    type Target = ReadCell<T>;

    fn deref(&self) -> &ReadCell<T> {
        &self.view
    }
}




// ============================================================================
impl<T: 'static> Observable<T> {

    pub fn new(value: T) -> Self {
        Self::named("cell", value)
    }

    /// Create a cell with a label. The label shows up in error messages
    /// produced by bindings on this cell.
    pub fn named(label: &str, value: T) -> Self {
        Self {
            view: ReadCell {
                inner: Rc::new(Inner {
                    label: label.to_string(),
                    value: RefCell::new(value),
                    subscribers: RefCell::new(Vec::new()),
                }),
            },
        }
    }

    pub fn view(&self) -> &ReadCell<T> {
        &self.view
    }

    /// Store a new value and run the cascade. The value is stored even if
    /// some subscribers fail; their errors are joined and returned once all
    /// of them have run.
    pub fn set(&self, value: T) -> Result<()> {
        match self.view.inner.value.try_borrow_mut() {
            Ok(mut slot) => *slot = value,
            Err(_) => return Err(Error::InvalidState("cell was set during its own cascade")),
        }
        self.notify()
    }
}
