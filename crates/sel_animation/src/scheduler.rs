//! Animation scheduler
//!
//! Owns every active run and advances them once per frame. The host calls
//! [`AnimationScheduler::tick`] from its "before next repaint" hook; each call
//! reads the injected [`Clock`] once and steps every run against that time.
//!
//! Runs never share state. Two runs writing the same property will both write
//! it every frame, in request order, and the later write wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::easing::EasingRegistry;
use crate::error::ConfigurationError;
use crate::request::{FrameOptions, InterpolationRequest, Tick};
use crate::run::{FinishCallback, InterpolationRun, RunHandle, RunState, RunStatus, TickCallback};

new_key_type! {
    pub struct RunId;
}

struct SchedulerInner {
    clock: Arc<dyn Clock>,
    registry: EasingRegistry,
    runs: Mutex<SlotMap<RunId, InterpolationRun>>,
    /// Runs requested since the last frame; they join on the next tick
    pending: Mutex<Vec<InterpolationRun>>,
    /// Status of every run taken out of `runs` while a frame is being
    /// processed, so `cancel_all` can still reach them
    in_flight: Mutex<Vec<Arc<RunStatus>>>,
    epoch: AtomicU64,
    next_serial: AtomicU64,
    frames: AtomicU64,
}

/// The scheduler that ticks all active interpolation runs.
///
/// Cheap to clone; clones drive the same set of runs.
#[derive(Clone)]
pub struct AnimationScheduler {
    inner: Arc<SchedulerInner>,
}

impl AnimationScheduler {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::with_registry(clock, EasingRegistry::with_builtins())
    }

    /// Use a registry with additional named easings
    pub fn with_registry(clock: impl Clock + 'static, registry: EasingRegistry) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                clock: Arc::new(clock),
                registry,
                runs: Mutex::new(SlotMap::with_key()),
                pending: Mutex::new(Vec::new()),
                in_flight: Mutex::new(Vec::new()),
                epoch: AtomicU64::new(0),
                next_serial: AtomicU64::new(1),
                frames: AtomicU64::new(0),
            }),
        }
    }

    /// Scheduler on the monotonic wall clock
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }

    /// Scheduler on a hand-driven clock, for headless use
    pub fn manual() -> (Self, ManualClock) {
        let clock = ManualClock::new();
        (Self::new(clock.clone()), clock)
    }

    pub fn registry(&self) -> &EasingRegistry {
        &self.inner.registry
    }

    pub fn now_ms(&self) -> f64 {
        self.inner.clock.now_ms()
    }

    /// Validate `options` and schedule a run; `on_tick` receives the values every frame.
    ///
    /// Fails before anything is scheduled if the options are inconsistent.
    pub fn request_frame<F>(
        &self,
        options: &FrameOptions,
        on_tick: F,
    ) -> Result<RunHandle, ConfigurationError>
    where
        F: FnMut(Tick<'_>) + Send + 'static,
    {
        let request = InterpolationRequest::resolve(options, &self.inner.registry)?;
        Ok(self.schedule(request, Box::new(on_tick), None))
    }

    /// Like [`request_frame`](Self::request_frame), with a callback that fires
    /// once the run completes or is cancelled
    pub fn request_frame_with<F, D>(
        &self,
        options: &FrameOptions,
        on_tick: F,
        on_finish: D,
    ) -> Result<RunHandle, ConfigurationError>
    where
        F: FnMut(Tick<'_>) + Send + 'static,
        D: FnOnce(RunState) + Send + 'static,
    {
        let request = InterpolationRequest::resolve(options, &self.inner.registry)?;
        Ok(self.schedule(request, Box::new(on_tick), Some(Box::new(on_finish))))
    }

    /// Schedule an already validated request
    pub fn schedule(
        &self,
        request: InterpolationRequest,
        on_tick: TickCallback,
        on_finish: Option<FinishCallback>,
    ) -> RunHandle {
        let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        tracing::debug!(
            "run {} scheduled: {} value(s), {}ms, easing {:?}",
            serial,
            request.to_values().len(),
            request.duration_ms(),
            request.easing()
        );
        let (run, handle) = InterpolationRun::new(serial, epoch, request, on_tick, on_finish);
        self.inner.pending.lock().push(run);
        handle
    }

    /// Advance all runs to the clock's current time.
    ///
    /// Returns the number of runs still active afterwards.
    pub fn tick(&self) -> usize {
        let now = self.inner.clock.now_ms();

        // Work on a detached table so callbacks may request or cancel runs
        let mut runs = std::mem::take(&mut *self.inner.runs.lock());
        for run in self.inner.pending.lock().drain(..) {
            runs.insert(run);
        }
        *self.inner.in_flight.lock() = runs.values().map(InterpolationRun::status).collect();

        for (_, run) in runs.iter_mut() {
            // A callback earlier in this frame may have called `cancel_all`
            let epoch = self.inner.epoch.load(Ordering::Acquire);
            if run.epoch() < epoch {
                run.request_cancel();
            }
            run.step(now);
        }
        runs.retain(|_, run| !run.is_finished());

        let remaining = runs.len();
        *self.inner.runs.lock() = runs;
        self.inner.in_flight.lock().clear();
        self.inner.frames.fetch_add(1, Ordering::Relaxed);

        remaining + self.inner.pending.lock().len()
    }

    /// Cancel every run that exists right now, including ones not yet started
    pub fn cancel_all(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!("cancelling all runs (epoch {})", epoch);
        for (_, run) in self.inner.runs.lock().iter() {
            run.request_cancel();
        }
        for run in self.inner.pending.lock().iter() {
            run.request_cancel();
        }
        for status in self.inner.in_flight.lock().iter() {
            status.request_cancel();
        }
    }

    /// Runs scheduled or playing
    pub fn active_count(&self) -> usize {
        self.inner.runs.lock().len()
            + self.inner.pending.lock().len()
            + self.inner.in_flight.lock().len()
    }

    pub fn has_active_runs(&self) -> bool {
        self.active_count() > 0
    }

    /// Frames processed so far
    pub fn frame_count(&self) -> u64 {
        self.inner.frames.load(Ordering::Relaxed)
    }

    /// Drive a manual clock: tick, then advance by `frame_ms`, until idle or
    /// `max_frames` frames have run. Returns the number of frames run.
    pub fn run_frames(&self, clock: &ManualClock, frame_ms: f64, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.has_active_runs() {
            self.tick();
            clock.advance(frame_ms);
            frames += 1;
        }
        frames
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::system()
    }
}
