use std::cell::RefCell;
use tempo_scheduler::Scheduler;

thread_local! {
    static ROOT: RefCell<Option<Scheduler>> = const { RefCell::new(None) };
    static PROVIDED: RefCell<Vec<Scheduler>> = const { RefCell::new(Vec::new()) };
}

/// Installs the fallback scheduler for this thread, returning the previous one.
pub fn set_root(scheduler: Scheduler) -> Option<Scheduler> {
    ROOT.with(|root| root.borrow_mut().replace(scheduler))
}

pub fn clear_root() -> Option<Scheduler> {
    ROOT.with(|root| root.borrow_mut().take())
}

pub fn root() -> Option<Scheduler> {
    ROOT.with(|root| root.borrow().clone())
}

/// Runs `f` with `scheduler` as the current scheduler. Scopes nest; the innermost wins.
pub fn provide<F, R>(scheduler: &Scheduler, f: F) -> R
where
    F: FnOnce() -> R,
{
    PROVIDED.with(|provided| provided.borrow_mut().push(scheduler.clone()));
    let _scope = ProvideScope;
    f()
}

/// The innermost provided scheduler, else the root one.
pub fn current() -> Option<Scheduler> {
    PROVIDED
        .with(|provided| provided.borrow().last().cloned())
        .or_else(root)
}

/// Pops the provided scheduler even if `f` unwinds.
struct ProvideScope;

impl Drop for ProvideScope {
    fn drop(&mut self) {
        PROVIDED.with(|provided| provided.borrow_mut().pop());
    }
}
