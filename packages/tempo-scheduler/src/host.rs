//! The low-level primitives a [`crate::Scheduler`] consumes.
//!
//! Hosts are chosen once, at construction, through [`Capabilities`]. A timer-only host
//! behaves as an always-visible page with no animation frames and no focus events.

use std::fmt;
use std::rc::Rc;

/// Opaque identifier for a timer, frame request or listener issued by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(pub u64);

/// One-shot callback run when a timer or frame fires.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Callback run every time the page regains focus, until removed.
pub type FocusCallback = Rc<dyn Fn()>;

/// A coarse one-shot timer.
///
/// Clearing a handle that already fired or was already cleared must be a no-op.
pub trait TimerHost {
    fn set_timer(&self, callback: TimerCallback, delay_ms: f64) -> HostHandle;

    fn clear_timer(&self, handle: HostHandle);
}

/// Browser-like page facilities: animation frames, visibility and focus.
pub trait PageHost {
    fn request_frame(&self, callback: TimerCallback) -> HostHandle;

    fn cancel_frame(&self, handle: HostHandle);

    fn is_hidden(&self) -> bool;

    fn add_focus_listener(&self, callback: FocusCallback) -> HostHandle;

    fn remove_focus_listener(&self, handle: HostHandle);
}

#[derive(Clone)]
pub enum Capabilities {
    Full {
        timers: Rc<dyn TimerHost>,
        page: Rc<dyn PageHost>,
    },
    TimerOnly(Rc<dyn TimerHost>),
}

impl Capabilities {
    pub fn full<H>(host: Rc<H>) -> Self
    where
        H: TimerHost + PageHost + 'static,
    {
        Self::Full {
            timers: host.clone(),
            page: host,
        }
    }

    pub fn timer_only<H>(host: Rc<H>) -> Self
    where
        H: TimerHost + 'static,
    {
        Self::TimerOnly(host)
    }

    pub fn timers(&self) -> &dyn TimerHost {
        match self {
            Self::Full { timers, .. } => timers.as_ref(),
            Self::TimerOnly(timers) => timers.as_ref(),
        }
    }

    pub fn page(&self) -> Option<&dyn PageHost> {
        match self {
            Self::Full { page, .. } => Some(page.as_ref()),
            Self::TimerOnly(_) => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.page().is_some_and(|page| page.is_hidden())
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full { .. } => f.write_str("Capabilities::Full"),
            Self::TimerOnly(_) => f.write_str("Capabilities::TimerOnly"),
        }
    }
}
