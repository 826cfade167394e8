use std::cell::RefCell;
use std::rc::Rc;
use tempo_scheduler::ManualHost;
use tempo_watch::{EXPIRED, QuantizeError, WatchError, countdown};

#[test]
fn test_counts_down_in_whole_intervals() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 305.0, 100.0).unwrap();
    assert_eq!(watch.get(), 300.0);
    assert_eq!(watch.next_wake(), Some(5.0));

    host.advance(10.0);
    assert_eq!(watch.get(), 200.0);
    host.advance(100.0);
    assert_eq!(watch.get(), 100.0);
    host.advance(100.0);
    assert_eq!(watch.get(), 0.0);
    host.advance(100.0);
    assert_eq!(watch.get(), EXPIRED);
    assert_eq!(watch.revision(), 4);

    assert!(watch.is_final());
    assert!(!scheduler.is_armed());
    assert_eq!(host.live_timers(), 0);
}

#[test]
fn test_value_changes_exactly_on_the_grid() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 374.0, 100.0).unwrap();
    assert_eq!(watch.get(), 300.0);

    host.advance(73.0);
    assert_eq!(watch.get(), 300.0);
    assert_eq!(watch.revision(), 0);

    host.advance(1.0);
    assert_eq!(watch.get(), 200.0);
    assert_eq!(watch.next_wake(), Some(174.0));
}

#[test]
fn test_expired_target_never_schedules() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, -1000.0, 100.0).unwrap();

    assert_eq!(watch.get(), EXPIRED);
    assert!(watch.is_final());
    assert!(scheduler.is_empty());
    assert_eq!(host.stats().timers_set, 0);
}

#[test]
fn test_target_change_recomputes_immediately() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 1005.0, 100.0).unwrap();
    assert_eq!(watch.get(), 1000.0);

    watch.set_target(105.0).unwrap();
    assert_eq!(watch.get(), 100.0);
    assert_eq!(scheduler.len(), 1);
}

#[test]
fn test_interval_change_recomputes_immediately() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 805.0, 500.0).unwrap();
    assert_eq!(watch.get(), 500.0);

    watch.set_interval(100.0).unwrap();
    assert_eq!(watch.get(), 800.0);
}

#[test]
fn test_restarts_after_new_target() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, -1000.0, 100.0).unwrap();

    host.advance(250.0);
    assert_eq!(watch.get(), EXPIRED);

    watch.set_target(505.0).unwrap();
    assert_eq!(watch.get(), 200.0);
    assert_eq!(watch.next_wake(), Some(305.0));

    host.advance(100.0);
    assert_eq!(watch.get(), 100.0);
}

#[test]
fn test_reached_target_cancels_pending_wake() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 1000.0, 100.0).unwrap();
    assert!(scheduler.is_armed());

    watch.set_target(-1000.0).unwrap();
    assert_eq!(watch.get(), EXPIRED);
    assert!(scheduler.is_empty());
    assert_eq!(host.live_timers(), 0);

    host.advance(100.0);
    assert_eq!(watch.get(), EXPIRED);
}

#[test]
fn test_infinite_target_holds_infinity() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, f64::INFINITY, 100.0).unwrap();

    assert_eq!(watch.get(), f64::INFINITY);
    assert!(watch.is_final());
    assert_eq!(host.stats().timers_set, 0);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();

    let err = countdown(&scheduler, f64::NAN, 100.0).unwrap_err();
    assert!(matches!(
        err,
        WatchError::Quantize(QuantizeError::InvalidTarget(_))
    ));
    assert_eq!(
        countdown(&scheduler, 100.0, 0.0).unwrap_err(),
        WatchError::Quantize(QuantizeError::InvalidInterval(0.0))
    );

    let watch = countdown(&scheduler, 500.0, 100.0).unwrap();
    assert!(watch.set_interval(-5.0).is_err());
    assert_eq!(watch.get(), 400.0);
    assert!(!scheduler.is_empty());
}

#[test]
fn test_subscribers_follow_the_countdown() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let watch = countdown(&scheduler, 305.0, 100.0).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    watch.subscribe(move |value| sink.borrow_mut().push(*value));

    host.advance(400.0);
    assert_eq!(*seen.borrow(), vec![200.0, 100.0, 0.0, EXPIRED]);
}

#[test]
fn test_dropped_countdown_stops_firing() {
    let host = ManualHost::timer_only();
    let scheduler = host.scheduler();
    let seen = Rc::new(RefCell::new(0));

    let watch = countdown(&scheduler, 305.0, 100.0).unwrap();
    let sink = seen.clone();
    watch.subscribe(move |_| *sink.borrow_mut() += 1);
    host.advance(10.0);
    drop(watch);

    host.advance(1000.0);
    assert_eq!(*seen.borrow(), 1);
    assert!(scheduler.is_empty());
}
