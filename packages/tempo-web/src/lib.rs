//! Browser host: `setTimeout` for coarse wakes, `requestAnimationFrame` for short ones,
//! `document.hidden` for throttling and window focus to resync after a backgrounded tab.

use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tempo_scheduler::{
    Capabilities, FocusCallback, HostHandle, PageHost, Scheduler, SchedulerOptions, TimerCallback,
    TimerHost,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WebHostError {
    #[error("no global `window` exists")]
    NoWindow,
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<JsValue> for WebHostError {
    fn from(value: JsValue) -> Self {
        Self::Js(format!("{value:?}"))
    }
}

type Pending<C> = Rc<RefCell<FxHashMap<u64, (i32, C)>>>;

pub struct WebHost {
    window: Window,
    document: Option<Document>,
    timers: Pending<Closure<dyn FnMut()>>,
    frames: Pending<Closure<dyn FnMut(f64)>>,
    focus: RefCell<FxHashMap<u64, Closure<dyn FnMut()>>>,
    next_id: Cell<u64>,
}

impl WebHost {
    pub fn new() -> Result<Rc<Self>, WebHostError> {
        let window = web_sys::window().ok_or(WebHostError::NoWindow)?;
        let document = window.document();
        Ok(Rc::new(Self {
            window,
            document,
            timers: Rc::default(),
            frames: Rc::default(),
            focus: RefCell::default(),
            next_id: Cell::new(0),
        }))
    }

    /// Full page capabilities when a document is attached, plain timers otherwise
    /// (e.g. inside a worker).
    pub fn capabilities(self: &Rc<Self>) -> Capabilities {
        if self.document.is_some() {
            Capabilities::full(Rc::clone(self))
        } else {
            Capabilities::timer_only(Rc::clone(self))
        }
    }

    /// A scheduler on this host, clocked by `Date.now()`.
    pub fn scheduler(self: &Rc<Self>, options: SchedulerOptions) -> Scheduler {
        Scheduler::builder(self.capabilities())
            .clock(js_sys::Date::now)
            .options(options)
            .build()
    }

    pub fn live_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn live_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn live_focus_listeners(&self) -> usize {
        self.focus.borrow().len()
    }

    fn allocate(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl TimerHost for WebHost {
    fn set_timer(&self, callback: TimerCallback, delay_ms: f64) -> HostHandle {
        let id = self.allocate();
        let timers = Rc::clone(&self.timers);
        let closure: Closure<dyn FnMut()> = Closure::once(move || {
            // wasm-bindgen defers freeing a closure that is still running.
            let fired = timers.borrow_mut().remove(&id);
            drop(fired);
            callback();
        });

        let scheduled = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms.max(0.0) as i32,
            );
        match scheduled {
            Ok(raw) => {
                self.timers.borrow_mut().insert(id, (raw, closure));
            }
            Err(err) => tracing::error!("setTimeout failed: {}", WebHostError::from(err)),
        }
        HostHandle(id)
    }

    fn clear_timer(&self, handle: HostHandle) {
        let removed = self.timers.borrow_mut().remove(&handle.0);
        if let Some((raw, _closure)) = removed {
            self.window.clear_timeout_with_handle(raw);
        }
    }
}

impl PageHost for WebHost {
    fn request_frame(&self, callback: TimerCallback) -> HostHandle {
        let id = self.allocate();
        let frames = Rc::clone(&self.frames);
        let closure: Closure<dyn FnMut(f64)> = Closure::once(move |_timestamp: f64| {
            let fired = frames.borrow_mut().remove(&id);
            drop(fired);
            callback();
        });

        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(raw) => {
                self.frames.borrow_mut().insert(id, (raw, closure));
            }
            Err(err) => tracing::error!(
                "requestAnimationFrame failed: {}",
                WebHostError::from(err)
            ),
        }
        HostHandle(id)
    }

    fn cancel_frame(&self, handle: HostHandle) {
        let removed = self.frames.borrow_mut().remove(&handle.0);
        if let Some((raw, _closure)) = removed {
            if let Err(err) = self.window.cancel_animation_frame(raw) {
                tracing::warn!("cancelAnimationFrame failed: {}", WebHostError::from(err));
            }
        }
    }

    fn is_hidden(&self) -> bool {
        self.document.as_ref().is_some_and(Document::hidden)
    }

    fn add_focus_listener(&self, callback: FocusCallback) -> HostHandle {
        let id = self.allocate();
        let closure = Closure::<dyn FnMut()>::new(move || callback());
        match self
            .window
            .add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref())
        {
            Ok(()) => {
                self.focus.borrow_mut().insert(id, closure);
            }
            Err(err) => tracing::error!("adding focus listener failed: {}", WebHostError::from(err)),
        }
        HostHandle(id)
    }

    fn remove_focus_listener(&self, handle: HostHandle) {
        let removed = self.focus.borrow_mut().remove(&handle.0);
        if let Some(closure) = removed {
            if let Err(err) = self
                .window
                .remove_event_listener_with_callback("focus", closure.as_ref().unchecked_ref())
            {
                tracing::warn!("removing focus listener failed: {}", WebHostError::from(err));
            }
        }
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        for (_, (raw, _)) in self.timers.borrow_mut().drain() {
            self.window.clear_timeout_with_handle(raw);
        }
        for (_, (raw, _)) in self.frames.borrow_mut().drain() {
            let _ = self.window.cancel_animation_frame(raw);
        }
        for (_, closure) in self.focus.get_mut().drain() {
            let _ = self
                .window
                .remove_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
        }
    }
}

/// Builds a browser scheduler and installs it as this thread's root scheduler, so `use_*`
/// watches work without an explicit provider.
pub fn install(options: SchedulerOptions) -> Result<Scheduler, WebHostError> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let scheduler = WebHost::new()?.scheduler(options);
    tempo_watch::context::set_root(scheduler.clone());
    tracing::debug!("installed browser root scheduler");
    Ok(scheduler)
}

/// JavaScript entry point for [`install`] with default options.
#[wasm_bindgen(js_name = installScheduler)]
pub fn install_default() -> Result<(), JsValue> {
    install(SchedulerOptions::default())
        .map(drop)
        .map_err(|err| JsValue::from_str(&err.to_string()))
}
