use crate::WatchError;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tempo_quantize::{QuantizeError, Sample, Time};
use tempo_scheduler::{Cancel, Scheduler};

/// Parameters that derive a time-dependent value.
pub trait Sampler: Clone + 'static {
    type Value: Clone + PartialEq + 'static;

    fn sample(&self, now: Time) -> Result<Sample<Self::Value>, QuantizeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<V> = Rc<dyn Fn(&Sample<V>)>;

/// A value kept current by a scheduler.
///
/// At most one wake is pending per watch. The scheduled callback only holds a weak reference,
/// so dropping the last handle cancels the wake and nothing fires afterwards.
pub struct Watch<S: Sampler> {
    inner: Rc<WatchInner<S>>,
}

struct WatchInner<S: Sampler> {
    scheduler: Scheduler,
    params: RefCell<S>,
    value: RefCell<S::Value>,
    wake: Cell<Option<Time>>,
    pending: RefCell<Cancel>,
    revision: Cell<u64>,
    subscribers: RefCell<SmallVec<[(SubscriptionId, Subscriber<S::Value>); 2]>>,
    next_subscription: Cell<u64>,
}

impl<S: Sampler> Watch<S> {
    /// Samples `params` now and subscribes for the next change.
    pub fn new(scheduler: &Scheduler, params: S) -> Result<Self, WatchError> {
        let sample = params.sample(scheduler.get_time())?;
        let inner = Rc::new(WatchInner {
            scheduler: scheduler.clone(),
            params: RefCell::new(params),
            value: RefCell::new(sample.value),
            wake: Cell::new(None),
            pending: RefCell::new(Cancel::noop()),
            revision: Cell::new(0),
            subscribers: RefCell::new(SmallVec::new()),
            next_subscription: Cell::new(0),
        });
        WatchInner::resubscribe(&inner, sample.wake);
        Ok(Self { inner })
    }

    pub fn get(&self) -> S::Value {
        self.inner.value.borrow().clone()
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S::Value) -> R,
    {
        f(&self.inner.value.borrow())
    }

    /// Bumped every time the value changes.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// When the pending wake is due, `None` once the value is final.
    pub fn next_wake(&self) -> Option<Time> {
        self.inner.wake.get()
    }

    pub fn is_final(&self) -> bool {
        self.inner.wake.get().is_none()
    }

    /// The current value together with the wake that was scheduled for it.
    pub fn sample(&self) -> Sample<S::Value> {
        Sample {
            value: self.get(),
            wake: self.inner.wake.get(),
        }
    }

    pub fn params(&self) -> S {
        self.inner.params.borrow().clone()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Changes the parameters and recomputes immediately.
    ///
    /// Invalid parameters are rejected and leave the watch untouched.
    pub fn update<F>(&self, f: F) -> Result<(), WatchError>
    where
        F: FnOnce(&mut S),
    {
        let mut params = self.params();
        f(&mut params);
        let sample = params.sample(self.inner.scheduler.get_time())?;
        *self.inner.params.borrow_mut() = params;
        WatchInner::apply(&self.inner, sample);
        Ok(())
    }

    /// Recomputes from the scheduler's clock without waiting for the wake.
    pub fn refresh(&self) {
        WatchInner::refresh(&self.inner);
    }

    pub fn subscribe<F>(&self, on_change: F) -> SubscriptionId
    where
        F: Fn(&S::Value) + 'static,
    {
        self.subscribe_samples(move |sample: &Sample<S::Value>| on_change(&sample.value))
    }

    /// Like [`subscribe`](Self::subscribe), but each change also carries its next wake.
    pub fn subscribe_samples<F>(&self, on_change: F) -> SubscriptionId
    where
        F: Fn(&Sample<S::Value>) + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(on_change)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }
}

impl<S: Sampler> WatchInner<S> {
    fn refresh(this: &Rc<Self>) {
        let now = this.scheduler.get_time();
        let sampled = this.params.borrow().sample(now);
        match sampled {
            Ok(sample) => Self::apply(this, sample),
            // Parameters are validated on the way in.
            Err(err) => tracing::warn!("watch refresh failed: {}", err),
        }
    }

    fn apply(this: &Rc<Self>, sample: Sample<S::Value>) {
        let changed = {
            let mut value = this.value.borrow_mut();
            if *value != sample.value {
                *value = sample.value;
                true
            } else {
                false
            }
        };

        if sample.wake != this.wake.get() || !this.pending.borrow().is_pending() {
            Self::resubscribe(this, sample.wake);
        }

        if changed {
            this.revision.set(this.revision.get() + 1);
            Self::notify(this);
        }
    }

    fn resubscribe(this: &Rc<Self>, wake: Option<Time>) {
        let pending = match wake {
            Some(target) => {
                let weak: Weak<Self> = Rc::downgrade(this);
                this.scheduler.schedule(
                    move |_| {
                        if let Some(inner) = weak.upgrade() {
                            Self::refresh(&inner);
                        }
                    },
                    target,
                )
            }
            None => Cancel::noop(),
        };
        this.wake.set(wake);
        let previous = this.pending.replace(pending);
        previous.cancel();
    }

    fn notify(this: &Rc<Self>) {
        let subscribers: SmallVec<[Subscriber<S::Value>; 2]> = this
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        if subscribers.is_empty() {
            return;
        }
        let sample = Sample {
            value: this.value.borrow().clone(),
            wake: this.wake.get(),
        };
        for subscriber in subscribers {
            subscriber(&sample);
        }
    }
}

impl<S: Sampler> Drop for WatchInner<S> {
    fn drop(&mut self) {
        self.pending.get_mut().cancel();
    }
}

impl<S> fmt::Debug for Watch<S>
where
    S: Sampler + fmt::Debug,
    S::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("params", &*self.inner.params.borrow())
            .field("value", &*self.inner.value.borrow())
            .field("next_wake", &self.inner.wake.get())
            .field("revision", &self.inner.revision.get())
            .finish()
    }
}
