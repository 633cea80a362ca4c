//! Runtime state of one driver invocation
//!
//! A run is a small state machine advanced once per frame:
//!
//! ```text
//! Scheduled ──> Ticking ──> Scheduled      (next replay cycle)
//!                      ├──> YoyoScheduled  (forward leg done, yoyo pending)
//!                      ├──> Completed
//!                      └──> Cancelled
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use crate::request::{InterpolationRequest, Replay, Shape, Tick, ValueVec};

/// Per-frame callback receiving the interpolated values
pub type TickCallback = Box<dyn FnMut(Tick<'_>) + Send>;

/// Called once when a run completes or is cancelled
pub type FinishCallback = Box<dyn FnOnce(RunState) + Send>;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for the forward leg to start (first frame or delay window)
    Scheduled = 0,
    /// Interpolating
    Ticking = 1,
    /// Forward leg reached its target; waiting for the yoyo leg
    YoyoScheduled = 2,
    Completed = 3,
    Cancelled = 4,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        matches!(self, RunState::Completed | RunState::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::Scheduled,
            1 => RunState::Ticking,
            2 => RunState::YoyoScheduled,
            3 => RunState::Completed,
            _ => RunState::Cancelled,
        }
    }
}

/// Direction of the current leg
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Forward,
    Yoyo,
}

/// State shared between a run and its handles
#[derive(Debug)]
pub(crate) struct RunStatus {
    state: AtomicU8,
    cancel_requested: AtomicBool,
    cycles_completed: AtomicU32,
    ticks: AtomicU32,
}

impl RunStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(RunState::Scheduled as u8),
            cancel_requested: AtomicBool::new(false),
            cycles_completed: AtomicU32::new(0),
            ticks: AtomicU32::new(0),
        }
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }
}

/// Handle to a scheduled run.
///
/// Dropping the handle does not stop the run; call [`RunHandle::cancel`].
#[derive(Clone, Debug)]
pub struct RunHandle {
    serial: u64,
    status: Arc<RunStatus>,
}

impl RunHandle {
    /// Stop the run. No further ticks are delivered; the run is released on
    /// the scheduler's next frame. Has no effect on a finished run.
    pub fn cancel(&self) {
        if !self.status.state().is_finished() {
            self.status.cancel_requested.store(true, Ordering::Release);
        }
    }

    pub fn state(&self) -> RunState {
        let state = self.status.state();
        if !state.is_finished() && self.status.cancel_requested.load(Ordering::Acquire) {
            RunState::Cancelled
        } else {
            state
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Full forward (plus yoyo) cycles played so far
    pub fn cycles_completed(&self) -> u32 {
        self.status.cycles_completed.load(Ordering::Acquire)
    }

    /// Number of tick callbacks delivered so far
    pub fn tick_count(&self) -> u32 {
        self.status.ticks.load(Ordering::Acquire)
    }

    /// Scheduler-unique serial number
    pub fn id(&self) -> u64 {
        self.serial
    }
}

/// A set of runs started together, e.g. one per selected element
#[derive(Clone, Debug, Default)]
pub struct RunGroup {
    handles: Vec<RunHandle>,
}

impl RunGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: RunHandle) {
        self.handles.push(handle);
    }

    pub fn cancel(&self) {
        self.handles.iter().for_each(RunHandle::cancel);
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(RunHandle::is_finished)
    }

    pub fn handles(&self) -> &[RunHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl FromIterator<RunHandle> for RunGroup {
    fn from_iter<I: IntoIterator<Item = RunHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

/// Mutable state of one active run, owned by the scheduler
pub struct InterpolationRun {
    serial: u64,
    epoch: u64,
    request: InterpolationRequest,
    status: Arc<RunStatus>,
    leg: Leg,
    leg_start: Option<f64>,
    cycle: u32,
    remaining: Replay,
    values: ValueVec,
    on_tick: TickCallback,
    on_finish: Option<FinishCallback>,
}

impl InterpolationRun {
    pub(crate) fn new(
        serial: u64,
        epoch: u64,
        request: InterpolationRequest,
        on_tick: TickCallback,
        on_finish: Option<FinishCallback>,
    ) -> (Self, RunHandle) {
        let status = Arc::new(RunStatus::new());
        let handle = RunHandle {
            serial,
            status: status.clone(),
        };
        let run = Self {
            serial,
            epoch,
            values: request.from.clone(),
            remaining: request.replay,
            request,
            status,
            leg: Leg::Forward,
            leg_start: None,
            cycle: 0,
            on_tick,
            on_finish,
        };
        (run, handle)
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> RunState {
        self.status.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub(crate) fn request_cancel(&self) {
        self.status.request_cancel();
    }

    pub(crate) fn status(&self) -> Arc<RunStatus> {
        self.status.clone()
    }

    /// Advance the run to frame time `now` (milliseconds)
    pub(crate) fn step(&mut self, now: f64) -> RunState {
        if self.is_finished() {
            return self.state();
        }
        if self.status.cancel_requested.load(Ordering::Acquire) {
            return self.finish(RunState::Cancelled);
        }

        let start = *self.leg_start.get_or_insert(now);
        let (duration, delay) = match self.leg {
            Leg::Forward => {
                let delay = if self.request.delay_once && self.cycle > 0 {
                    0.0
                } else {
                    self.request.delay_ms
                };
                (self.request.duration_ms, delay)
            }
            Leg::Yoyo => (self.request.yoyo_duration_ms, self.request.yoyo_delay_ms),
        };

        let elapsed = now - start - delay;
        if elapsed < 0.0 {
            return self.state();
        }

        if self.request.is_jump() {
            self.values.copy_from_slice(&self.request.to);
            self.emit();
            self.status.cycles_completed.fetch_add(1, Ordering::AcqRel);
            return self.finish(RunState::Completed);
        }

        let t = if duration <= 0.0 {
            1.0
        } else {
            (elapsed / duration).min(1.0)
        };

        let (a, b) = match self.leg {
            Leg::Forward => (&self.request.from, &self.request.to),
            Leg::Yoyo => (&self.request.to, &self.request.from),
        };
        if t >= 1.0 {
            // Land exactly on the leg target regardless of float drift
            self.values.copy_from_slice(b);
        } else {
            let eased = self.request.easing.apply(t as f32);
            for ((value, from), to) in self.values.iter_mut().zip(a.iter()).zip(b.iter()) {
                *value = from + (to - from) * eased;
            }
        }

        self.status.set_state(RunState::Ticking);
        self.emit();
        if self.status.cancel_requested.load(Ordering::Acquire) {
            return self.finish(RunState::Cancelled);
        }

        if t < 1.0 {
            return RunState::Ticking;
        }

        if self.leg == Leg::Forward && self.request.yoyo {
            self.leg = Leg::Yoyo;
            self.leg_start = Some(now);
            self.status.set_state(RunState::YoyoScheduled);
            return RunState::YoyoScheduled;
        }

        self.status.cycles_completed.fetch_add(1, Ordering::AcqRel);
        match self.remaining {
            Replay::Times(0) => self.finish(RunState::Completed),
            Replay::Times(n) => {
                self.remaining = Replay::Times(n - 1);
                self.restart(now)
            }
            Replay::Forever => self.restart(now),
        }
    }

    fn restart(&mut self, now: f64) -> RunState {
        self.leg = Leg::Forward;
        self.leg_start = Some(now);
        self.cycle += 1;
        self.status.set_state(RunState::Scheduled);
        RunState::Scheduled
    }

    fn emit(&mut self) {
        let tick = match self.request.shape {
            Shape::Scalar => Tick::Scalar(self.values[0]),
            Shape::Sequence => Tick::Sequence(&self.values),
        };
        (self.on_tick)(tick);
        self.status.ticks.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&mut self, state: RunState) -> RunState {
        self.status.set_state(state);
        tracing::debug!(
            "run {} {:?} after {} cycle(s)",
            self.serial,
            state,
            self.status.cycles_completed.load(Ordering::Acquire)
        );
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(state);
        }
        state
    }
}
