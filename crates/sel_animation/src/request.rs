//! Interpolation requests
//!
//! [`FrameOptions`] is the loose, caller-facing shape (it deserializes from the
//! same camelCase objects the options were historically written as).
//! [`InterpolationRequest`] is the validated, immutable form a run is built from.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::easing::{Easing, EasingRegistry};
use crate::error::ConfigurationError;

/// Inline storage for the value vector of a run
pub type ValueVec = SmallVec<[f32; 4]>;

/// One number or a sequence of numbers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values {
    Scalar(f32),
    Sequence(Vec<f32>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Scalar(_) => 1,
            Values::Sequence(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        match self {
            Values::Scalar(value) => std::slice::from_ref(value),
            Values::Sequence(values) => values,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Values::Scalar(_))
    }
}

impl From<f32> for Values {
    fn from(value: f32) -> Self {
        Values::Scalar(value)
    }
}

impl From<Vec<f32>> for Values {
    fn from(values: Vec<f32>) -> Self {
        Values::Sequence(values)
    }
}

impl<const N: usize> From<[f32; N]> for Values {
    fn from(values: [f32; N]) -> Self {
        Values::Sequence(values.to_vec())
    }
}

impl From<&[f32]> for Values {
    fn from(values: &[f32]) -> Self {
        Values::Sequence(values.to_vec())
    }
}

/// Easing given by catalog name or supplied directly
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EasingSpec {
    Named(String),
    #[serde(skip)]
    Function(Easing),
}

impl Default for EasingSpec {
    fn default() -> Self {
        EasingSpec::Named("linear".to_string())
    }
}

impl From<&str> for EasingSpec {
    fn from(name: &str) -> Self {
        EasingSpec::Named(name.to_string())
    }
}

impl From<String> for EasingSpec {
    fn from(name: String) -> Self {
        EasingSpec::Named(name)
    }
}

impl From<Easing> for EasingSpec {
    fn from(easing: Easing) -> Self {
        EasingSpec::Function(easing)
    }
}

impl EasingSpec {
    pub fn resolve(&self, registry: &EasingRegistry) -> Result<Easing, ConfigurationError> {
        match self {
            EasingSpec::Named(name) => registry.resolve(name),
            EasingSpec::Function(easing) => Ok(easing.clone()),
        }
    }
}

/// Options for one driver run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOptions {
    /// Start values; all zeros matching `to` when omitted
    #[serde(default)]
    pub from: Option<Values>,
    pub to: Values,
    /// Forward leg duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Wait before the forward leg, in milliseconds
    #[serde(default)]
    pub delay: f64,
    /// Only wait `delay` on the first cycle
    #[serde(default)]
    pub delay_once: bool,
    #[serde(default, alias = "easingFunction")]
    pub easing: EasingSpec,
    #[serde(default)]
    pub yoyo: bool,
    /// Defaults to `duration`
    #[serde(default)]
    pub yoyo_duration: Option<f64>,
    /// Defaults to `delay`
    #[serde(default)]
    pub yoyo_delay: Option<f64>,
    /// Additional cycles after the first; -1 repeats forever
    #[serde(default)]
    pub replay: i32,
}

fn default_duration() -> f64 {
    350.0
}

impl FrameOptions {
    pub fn new(to: impl Into<Values>) -> Self {
        Self {
            from: None,
            to: to.into(),
            duration: default_duration(),
            delay: 0.0,
            delay_once: false,
            easing: EasingSpec::default(),
            yoyo: false,
            yoyo_duration: None,
            yoyo_delay: None,
            replay: 0,
        }
    }

    /// Parse options from a JSON object such as `{"from": 0, "to": 10, "easingFunction": "easeOutBack"}`
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_from(mut self, from: impl Into<Values>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_duration(mut self, ms: f64) -> Self {
        self.duration = ms;
        self
    }

    pub fn with_delay(mut self, ms: f64) -> Self {
        self.delay = ms;
        self
    }

    pub fn with_delay_once(mut self, once: bool) -> Self {
        self.delay_once = once;
        self
    }

    pub fn with_easing(mut self, easing: impl Into<EasingSpec>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn with_yoyo_duration(mut self, ms: f64) -> Self {
        self.yoyo_duration = Some(ms);
        self
    }

    pub fn with_yoyo_delay(mut self, ms: f64) -> Self {
        self.yoyo_delay = Some(ms);
        self
    }

    pub fn with_replay(mut self, replay: i32) -> Self {
        self.replay = replay;
        self
    }
}

/// How many cycles remain after the current one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replay {
    Times(u32),
    Forever,
}

impl Replay {
    pub fn from_count(count: i32) -> Result<Self, ConfigurationError> {
        match count {
            -1 => Ok(Replay::Forever),
            n if n >= 0 => Ok(Replay::Times(n as u32)),
            n => Err(ConfigurationError::InvalidReplay(n)),
        }
    }
}

/// Whether ticks report one value or a sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Sequence,
}

/// Validated, immutable configuration for one run
#[derive(Clone, Debug)]
pub struct InterpolationRequest {
    pub(crate) from: ValueVec,
    pub(crate) to: ValueVec,
    pub(crate) shape: Shape,
    pub(crate) duration_ms: f64,
    pub(crate) delay_ms: f64,
    pub(crate) delay_once: bool,
    pub(crate) easing: Easing,
    pub(crate) yoyo: bool,
    pub(crate) yoyo_duration_ms: f64,
    pub(crate) yoyo_delay_ms: f64,
    pub(crate) replay: Replay,
}

fn finite(value: f64, field: &'static str) -> Result<f64, ConfigurationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigurationError::NonFinite(field))
    }
}

impl InterpolationRequest {
    /// Validate options against an easing registry
    pub fn resolve(
        options: &FrameOptions,
        registry: &EasingRegistry,
    ) -> Result<Self, ConfigurationError> {
        if options.to.is_empty() {
            return Err(ConfigurationError::EmptyTarget);
        }

        let to: ValueVec = options.to.as_slice().iter().copied().collect();
        let from: ValueVec = match &options.from {
            Some(from) if from.len() != to.len() => {
                return Err(ConfigurationError::LengthMismatch {
                    from: from.len(),
                    to: to.len(),
                });
            }
            Some(from) => from.as_slice().iter().copied().collect(),
            None => smallvec::smallvec![0.0; to.len()],
        };

        if from.iter().chain(to.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigurationError::NonFinite("from/to"));
        }

        let duration_ms = finite(options.duration, "duration")?;
        let delay_ms = finite(options.delay, "delay")?.max(0.0);
        let yoyo_duration_ms = finite(options.yoyo_duration.unwrap_or(duration_ms), "yoyoDuration")?;
        let yoyo_delay_ms = finite(options.yoyo_delay.unwrap_or(delay_ms), "yoyoDelay")?.max(0.0);

        // A scalar `to` with an explicit sequence `from` of length one still ticks as a scalar
        let shape = if options.to.is_scalar() {
            Shape::Scalar
        } else {
            Shape::Sequence
        };

        Ok(Self {
            from,
            to,
            shape,
            duration_ms,
            delay_ms,
            delay_once: options.delay_once,
            easing: options.easing.resolve(registry)?,
            yoyo: options.yoyo,
            yoyo_duration_ms,
            yoyo_delay_ms,
            replay: Replay::from_count(options.replay)?,
        })
    }

    pub fn from_values(&self) -> &[f32] {
        &self.from
    }

    pub fn to_values(&self) -> &[f32] {
        &self.to
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn easing(&self) -> &Easing {
        &self.easing
    }

    pub fn replay(&self) -> Replay {
        self.replay
    }

    /// A zero or negative forward duration collapses the run to a single jump
    pub fn is_jump(&self) -> bool {
        self.duration_ms <= 0.0
    }
}

/// Values delivered to a tick callback.
///
/// Mirrors the request: a scalar `to` ticks with [`Tick::Scalar`], a
/// sequence ticks with [`Tick::Sequence`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick<'a> {
    Scalar(f32),
    Sequence(&'a [f32]),
}

impl Tick<'_> {
    /// The first (or only) value
    pub fn value(&self) -> f32 {
        match self {
            Tick::Scalar(value) => *value,
            Tick::Sequence(values) => values.first().copied().unwrap_or_default(),
        }
    }

    pub fn values(&self) -> &[f32] {
        match self {
            Tick::Scalar(value) => std::slice::from_ref(value),
            Tick::Sequence(values) => values,
        }
    }
}
