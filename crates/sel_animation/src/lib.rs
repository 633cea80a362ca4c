//! Sel Animation System
//!
//! Time-based value interpolation driven one frame at a time.
//!
//! # Features
//!
//! - **Easing catalog**: the 31 classic easings plus CSS timing keywords, `cubic-bezier()`
//!   and `steps()`
//! - **Interpolation driver**: one or many values tweened on a shared clock,
//!   with delay, yoyo, and finite or infinite replay
//! - **Cancellable runs**: every request returns a [`RunHandle`]
//! - **Injectable clocks**: drive frames from a host vsync or by hand in tests
//!
//! # Example
//!
//! ```rust
//! use sel_animation::{AnimationScheduler, FrameOptions};
//!
//! let (scheduler, clock) = AnimationScheduler::manual();
//! let handle = scheduler
//!     .request_frame(
//!         &FrameOptions::new(10.0).with_duration(100.0).with_easing("easeOutQuad"),
//!         |tick| println!("value: {}", tick.value()),
//!     )
//!     .unwrap();
//!
//! scheduler.run_frames(&clock, 16.0, 100);
//! assert!(handle.is_finished());
//! ```

pub mod clock;
pub mod easing;
pub mod error;
pub mod request;
pub mod run;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use easing::{Easing, EasingRegistry, StepPosition};
pub use error::ConfigurationError;
pub use request::{EasingSpec, FrameOptions, InterpolationRequest, Replay, Shape, Tick, Values};
pub use run::{Leg, RunGroup, RunHandle, RunState};
pub use scheduler::AnimationScheduler;
