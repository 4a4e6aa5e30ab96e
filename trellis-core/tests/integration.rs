//! Integration Tests for the Reactive System
//!
//! These tests drive signals, effects, watchers and computeds together
//! through the public API, the way a renderer would.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{capture_errors, init_test_logging};
use serde_json::json;
use tokio::task::LocalSet;
use trellis_core::{
    batch, computed, configure, effect, effect_scope, flush, has_pending, invoke_handler,
    keyed_list, next_tick, observe, render_effect, stats, watch, Error, ErrorContext,
    EffectHandle, RuntimeConfig, Signal, VecHost, WatchOptions,
};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

/// Test that a failing binding does not stop its siblings from updating.
#[test]
fn sibling_bindings_survive_a_failing_binding() {
    let errors = capture_errors(RuntimeConfig::new());
    let value = Signal::new(0);

    let first = Rc::new(Cell::new(0));
    let last = Rc::new(Cell::new(0));

    let (v, out) = (value.clone(), first.clone());
    let _a = render_effect(move || out.set(v.get()));

    let v = value.clone();
    let _b = render_effect(move || {
        let n = v.get();
        assert!(n % 2 == 0, "odd values are not renderable");
    });

    let (v, out) = (value.clone(), last.clone());
    let _c = render_effect(move || out.set(v.get()));

    value.set(1);
    flush();
    assert_eq!((first.get(), last.get()), (1, 1));
    assert_eq!(errors.borrow().len(), 1);

    value.set(2);
    flush();
    assert_eq!(errors.borrow().len(), 1);

    value.set(3);
    flush();
    assert_eq!((first.get(), last.get()), (3, 3));

    let errors = errors.borrow();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|(_, ctx)| *ctx == ErrorContext::Render));
    assert!(errors[0].0.contains("odd values are not renderable"));
}

/// Test that writes to two cells inside a batch cause exactly one flush.
#[test]
fn batch_coalesces_writes_into_one_flush() {
    init_test_logging();
    let a = Signal::new(1);
    let b = Signal::new(1);
    let (calls, sink) = counter();

    let (a2, b2) = (a.clone(), b.clone());
    let _w = watch(
        move || a2.get() + b2.get(),
        move |_, _| sink.set(sink.get() + 1),
        WatchOptions::new(),
    );

    let before = stats();
    batch(|| {
        a.set(10);
        b.set(20);
        assert!(has_pending());
    });

    assert_eq!(calls.get(), 1);
    assert_eq!(stats().flushes, before.flushes + 1);
}

/// Test that flushing with nothing pending does no work.
#[test]
fn flush_is_idempotent() {
    init_test_logging();
    let signal = Signal::new(0);
    let s = signal.clone();
    let handle = effect(move || {
        s.get();
    });

    signal.set(1);
    flush();
    let runs = handle.run_count();
    let after_first = stats();

    flush();
    flush();
    assert_eq!(handle.run_count(), runs);
    assert_eq!(stats(), after_first);
}

/// Test that an effect invalidated many times before a flush runs once.
#[test]
fn effect_runs_at_most_once_per_flush() {
    init_test_logging();
    let cells: Vec<Signal<i32>> = (0..3).map(Signal::new).collect();
    let watched = cells.clone();
    let handle = effect(move || {
        for cell in &watched {
            cell.get();
        }
    });
    assert_eq!(handle.run_count(), 1);

    for round in 1..=4 {
        for cell in &cells {
            cell.set(round * 10);
        }
    }
    flush();
    assert_eq!(handle.run_count(), 2);
}

/// Test that effects invalidated during a flush run in the same flush.
#[test]
fn cascading_effects_fold_into_the_same_flush() {
    init_test_logging();
    let source = Signal::new(1);
    let middle = Signal::new(0);
    let sink = Rc::new(Cell::new(0));

    let (m, out) = (middle.clone(), sink.clone());
    let _reader = effect(move || out.set(m.get()));

    let (s, m) = (source.clone(), middle.clone());
    let _writer = effect(move || {
        m.set(s.get() * 100);
    });

    let before = stats().flushes;
    source.set(2);
    flush();

    assert_eq!(sink.get(), 200);
    assert_eq!(stats().flushes, before + 1);
    assert!(!has_pending());
}

/// Test that a computed only re-evaluates when it is read.
#[test]
fn computed_is_lazy_across_writes() {
    init_test_logging();
    let price = Signal::new(10);
    let qty = Signal::new(2);
    let (calls, sink) = counter();

    let (p, q) = (price.clone(), qty.clone());
    let total = computed(move || {
        sink.set(sink.get() + 1);
        p.get() * q.get()
    });
    assert_eq!(calls.get(), 0);
    assert_eq!(total.value(), Some(20));

    price.set(11);
    qty.set(3);
    flush();
    assert_eq!(calls.get(), 1);
    assert!(total.is_dirty());

    assert_eq!(total.value(), Some(33));
    assert_eq!(total.value(), Some(33));
    assert_eq!(calls.get(), 2);
}

/// Test that two effects re-triggering each other hit the flush ceiling.
#[test]
fn ping_pong_effects_abort_the_flush() {
    let errors = capture_errors(RuntimeConfig::new().with_max_flush_iterations(8));
    let x = Signal::new(0);
    let y = Signal::new(0);

    let (x1, y1) = (x.clone(), y.clone());
    let ping = effect(move || {
        y1.set(x1.get() + 1);
    });
    let (x2, y2) = (x.clone(), y.clone());
    let pong = effect(move || {
        x2.set(y2.get() + 1);
    });

    x.set(100);
    flush();

    assert!(!has_pending());
    assert_eq!(stats().aborted, 1);
    assert_eq!(
        *errors.borrow(),
        vec![(
            Error::FlushLimitExceeded { limit: 8 }.to_string(),
            ErrorContext::Scheduler
        )]
    );

    // Both effects survive and still react to later writes.
    assert!(!ping.is_disposed() && !pong.is_disposed());
    assert!(ping.run_count() <= 9);
}

/// Test that an effect rewriting its own dependency is stopped as well.
#[test]
fn self_feeding_effect_is_bounded() {
    let errors = capture_errors(RuntimeConfig::new().with_max_flush_iterations(5));
    let count = Signal::new(0);

    let c = count.clone();
    let handle = effect(move || {
        let n = c.get();
        c.set(n + 1);
    });
    flush();

    assert_eq!(handle.run_count(), 6);
    assert_eq!(errors.borrow().len(), 1);
    assert_eq!(errors.borrow()[0].1, ErrorContext::Scheduler);
}

/// Test that disposing a pending effect during a flush cancels its run.
#[test]
fn disposal_during_flush_cancels_pending_run() {
    init_test_logging();
    let signal = Signal::new(0);
    let (victim_runs, sink) = counter();

    let s = signal.clone();
    let victim_slot: Rc<RefCell<Option<EffectHandle>>> = Rc::new(RefCell::new(None));
    let slot = victim_slot.clone();
    let _killer = effect(move || {
        if s.get() > 0 {
            if let Some(victim) = slot.borrow_mut().take() {
                victim.dispose();
            }
        }
    });

    let s = signal.clone();
    *victim_slot.borrow_mut() = Some(effect(move || {
        s.get();
        sink.set(sink.get() + 1);
    }));
    assert_eq!(victim_runs.get(), 1);

    signal.set(1);
    flush();
    assert_eq!(victim_runs.get(), 1);
    assert_eq!(signal.subscriber_count(), 1);
}

/// Test that handler failures are reported with the handler tag.
#[test]
fn handler_errors_are_tagged() {
    let errors = capture_errors(RuntimeConfig::new());

    assert_eq!(invoke_handler(|| 7), Some(7));
    let result: Option<()> = invoke_handler(|| panic!("click failed"));
    assert!(result.is_none());

    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].1, ErrorContext::Handler);
}

/// Test that configuring after first use is rejected.
#[test]
fn late_configuration_is_rejected() {
    init_test_logging();
    let signal = Signal::new(0);
    let s = signal.clone();
    let _e = effect(move || {
        s.get();
    });

    assert_eq!(
        configure(RuntimeConfig::new()),
        Err(Error::ConfiguredAfterUse)
    );
}

/// Test that dropping a scope's owner tears down everything inside it.
#[test]
fn scope_teardown_releases_subscriptions() {
    init_test_logging();
    let state = observe(json!({ "todos": [{ "title": "a" }, { "title": "b" }] })).unwrap();
    let signal = Signal::new(0);
    let scope = effect_scope();

    let (st, sg) = (state.clone(), signal.clone());
    scope.run(move || {
        let _ = watch(
            move || st.snapshot(),
            |_, _| {},
            WatchOptions::new().deep(true),
        );
        let _ = effect(move || {
            sg.get();
        });
    });
    assert_eq!(scope.len(), 2);
    assert_eq!(signal.subscriber_count(), 1);

    scope.dispose();
    assert_eq!(signal.subscriber_count(), 0);
}

/// Test that a keyed list binding keeps node identity across reorders.
#[test]
fn keyed_list_binding_reorders_without_recreating() {
    init_test_logging();
    let rows = Signal::new(vec!["a", "b", "c", "d"]);
    let host = Rc::new(RefCell::new(VecHost::<&str>::new()));

    let source = rows.clone();
    let binding = keyed_list(move || source.get(), Rc::clone(&host));
    let original = host.borrow().nodes().to_vec();

    rows.set(vec!["d", "a", "b", "c"]);
    flush();

    let host = host.borrow();
    assert_eq!(host.keys(), vec!["d", "a", "b", "c"]);
    assert_eq!(host.stats().created, 4);
    assert_eq!(host.stats().moved, 1);
    assert_eq!(host.nodes()[0], original[3]);
    assert_eq!(binding.run_count(), 2);
}

/// Test that `next_tick` performs the pending flush.
#[tokio::test]
async fn next_tick_flushes_pending_work() {
    init_test_logging();
    let signal = Signal::new(1);
    let seen = Rc::new(Cell::new(0));

    let (s, out) = (signal.clone(), seen.clone());
    let _e = effect(move || out.set(s.get()));

    signal.set(2);
    assert_eq!(seen.get(), 1);

    next_tick().await;
    assert_eq!(seen.get(), 2);
    assert!(!has_pending());
}

/// Test that a configured tick driver schedules one flush per burst of writes.
#[tokio::test]
async fn tick_driver_schedules_flush_on_local_set() {
    init_test_logging();
    let requests = Rc::new(Cell::new(0));
    let r = requests.clone();
    configure(RuntimeConfig::new().with_tick_driver(move || {
        r.set(r.get() + 1);
        tokio::task::spawn_local(async { flush() });
    }))
    .unwrap();

    let local = LocalSet::new();
    local
        .run_until(async {
            let signal = Signal::new(0);
            let seen = Rc::new(Cell::new(0));
            let (s, out) = (signal.clone(), seen.clone());
            let _e = effect(move || out.set(s.get()));

            signal.set(1);
            signal.set(2);
            signal.set(3);
            assert_eq!(requests.get(), 1);
            assert_eq!(seen.get(), 0);

            for _ in 0..16 {
                if !has_pending() {
                    break;
                }
                tokio::task::yield_now().await;
            }

            assert_eq!(seen.get(), 3);
            assert_eq!(requests.get(), 1);
        })
        .await;
}
