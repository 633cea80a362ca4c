//! Integration tests for the interpolation driver
//!
//! These tests drive the scheduler on a manual clock and verify that:
//! - Values follow the easing over the requested duration
//! - Jumps, yoyo legs and replays produce the expected callback sequences
//! - Cancellation stops infinite runs and releases them

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sel_animation::{
    AnimationScheduler, Clock, Easing, FrameOptions, ManualClock, RunHandle, RunState, Tick,
};

type Trace = Arc<Mutex<Vec<(f64, Vec<f32>)>>>;

/// Request a run that records (time, values) for every callback
fn record(
    scheduler: &AnimationScheduler,
    clock: &ManualClock,
    options: FrameOptions,
) -> (RunHandle, Trace) {
    let trace: Trace = Arc::default();
    let sink = trace.clone();
    let clock = clock.clone();
    let handle = scheduler
        .request_frame(&options, move |tick: Tick<'_>| {
            sink.lock().push((clock.now_ms(), tick.values().to_vec()));
        })
        .unwrap();
    (handle, trace)
}

/// Test that every catalog easing is pinned at both ends
#[test]
fn test_catalog_endpoints() {
    for (name, easing) in Easing::catalog() {
        assert_eq!(easing.apply(0.0), 0.0, "{name} at 0");
        assert_eq!(easing.apply(1.0), 1.0, "{name} at 1");
    }
}

/// Test that a linear run reads the midpoint halfway through
#[test]
fn test_linear_midpoint() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (_, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::new(100.0).with_duration(1000.0),
    );

    scheduler.tick();
    clock.advance(500.0);
    scheduler.tick();

    let trace = trace.lock();
    assert_eq!(trace[0].1, vec![0.0]);
    assert!((trace[1].1[0] - 50.0).abs() < 1e-3);
}

/// Test that a zero or negative duration delivers exactly one callback with `to`
#[test]
fn test_jump_delivers_single_callback() {
    for duration in [0.0, -250.0] {
        let (scheduler, clock) = AnimationScheduler::manual();
        let (handle, trace) = record(
            &scheduler,
            &clock,
            FrameOptions::new([3.0, 4.0])
                .with_from([1.0, 2.0])
                .with_duration(duration)
                .with_yoyo(true)
                .with_replay(3),
        );
        scheduler.run_frames(&clock, 16.0, 10);

        let trace = trace.lock();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].1, vec![3.0, 4.0]);
        assert_eq!(handle.state(), RunState::Completed);
    }
}

/// Test that yoyo returns to `from` and spans both legs
#[test]
fn test_yoyo_returns_to_from() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (handle, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::new(10.0)
            .with_from(2.0)
            .with_duration(100.0)
            .with_yoyo(true)
            .with_yoyo_duration(200.0),
    );
    scheduler.run_frames(&clock, 10.0, 100);

    let trace = trace.lock();
    let (first_at, first) = &trace[0];
    let (last_at, last) = &trace[trace.len() - 1];
    assert_eq!(first, &vec![2.0]);
    assert_eq!(last, &vec![2.0]);
    assert!(trace.iter().any(|(_, v)| v[0] == 10.0));
    assert_eq!(last_at - first_at, 300.0);
    assert_eq!(handle.cycles_completed(), 1);
}

/// Test that replay N plays N + 1 cycles and then completes
#[test]
fn test_replay_counts_cycles() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (handle, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::new(1.0).with_duration(50.0).with_replay(2),
    );
    scheduler.run_frames(&clock, 10.0, 1000);

    assert_eq!(handle.state(), RunState::Completed);
    assert_eq!(handle.cycles_completed(), 3);
    let arrivals = trace.lock().iter().filter(|(_, v)| v[0] == 1.0).count();
    assert_eq!(arrivals, 3);
}

/// Test that replay -1 keeps running until cancelled
#[test]
fn test_infinite_replay_until_cancelled() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (handle, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::new(1.0)
            .with_duration(30.0)
            .with_yoyo(true)
            .with_replay(-1),
    );

    let frames = scheduler.run_frames(&clock, 10.0, 500);
    assert_eq!(frames, 500);
    assert!(!handle.is_finished());
    assert!(handle.cycles_completed() > 10);

    handle.cancel();
    let ticks = trace.lock().len();
    scheduler.tick();
    assert_eq!(handle.state(), RunState::Cancelled);
    assert_eq!(trace.lock().len(), ticks);
    assert!(!scheduler.has_active_runs());
}

/// Test the 0 → 10 linear scenario: non-decreasing values ending exactly on 10
#[test]
fn test_monotonic_linear_scenario() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (handle, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::from_json(r#"{"from": 0, "to": 10, "duration": 100, "easing": "linear"}"#)
            .unwrap(),
    );
    scheduler.run_frames(&clock, 7.0, 100);

    let values: Vec<f32> = trace.lock().iter().map(|(_, v)| v[0]).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(values.last(), Some(&10.0));
    assert_eq!(handle.state(), RunState::Completed);
}

/// Test that delay_once only holds back the first cycle
#[test]
fn test_delay_once() {
    let (scheduler, clock) = AnimationScheduler::manual();
    let (_, trace) = record(
        &scheduler,
        &clock,
        FrameOptions::new(1.0)
            .with_duration(20.0)
            .with_delay(100.0)
            .with_delay_once(true)
            .with_replay(1),
    );
    scheduler.run_frames(&clock, 10.0, 100);

    let trace = trace.lock();
    let first_at = trace[0].0;
    let last_at = trace[trace.len() - 1].0;
    assert_eq!(first_at, 100.0);
    // second cycle starts right after the first lands at 120
    assert_eq!(last_at, 140.0);
}
