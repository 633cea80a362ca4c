//! Easing functions for animations
//!
//! The catalog maps names such as `easeInOutQuad` to pure functions of
//! normalized time. Every built-in satisfies `f(0) == 0` and `f(1) == 1`;
//! the `Back` and `Elastic` families overshoot in between.
//!
//! Names resolve through an [`EasingRegistry`]. The built-in registry is
//! immutable static data; extending it means building a new registry value
//! with [`EasingRegistry::register`].

use std::collections::hash_map::Entry;
use std::f32::consts::PI;
use std::fmt;
use std::sync::{Arc, OnceLock};

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0, u32 as step_count},
    combinator::{all_consuming, opt, value},
    number::complete::float,
    sequence::{delimited, preceded, tuple},
    IResult,
};
use rustc_hash::FxHashMap;

use crate::error::ConfigurationError;

/// Easing function type
#[derive(Clone, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
    CubicBezier(f32, f32, f32, f32),
    /// CSS `steps(n, start|end)`: `n` equal jumps
    Steps(u32, StepPosition),
    /// Caller-supplied function; expected to map 0 to 0 and 1 to 1
    Custom(CustomEasing),
}

/// Where a `steps()` easing makes its jump within each interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPosition {
    /// Jump at the start of each interval
    Start,
    /// Jump at the end of each interval
    End,
}

/// A named, shareable easing closure
#[derive(Clone)]
pub struct CustomEasing {
    name: Arc<str>,
    func: Arc<dyn Fn(f32) -> f32 + Send + Sync>,
}

impl CustomEasing {
    pub fn name(&self) -> &str {
        &self.name
    }
}

const C1: f32 = 1.70158;
const C2: f32 = C1 * 1.525;
const C3: f32 = C1 + 1.0;
const C4: f32 = (2.0 * PI) / 3.0;
const C5: f32 = (2.0 * PI) / 4.5;

/// Catalog names paired with their easing, in documentation order
const CATALOG: [(&str, Easing); 31] = [
    ("linear", Easing::Linear),
    ("easeInSine", Easing::EaseInSine),
    ("easeOutSine", Easing::EaseOutSine),
    ("easeInOutSine", Easing::EaseInOutSine),
    ("easeInQuad", Easing::EaseInQuad),
    ("easeOutQuad", Easing::EaseOutQuad),
    ("easeInOutQuad", Easing::EaseInOutQuad),
    ("easeInCubic", Easing::EaseInCubic),
    ("easeOutCubic", Easing::EaseOutCubic),
    ("easeInOutCubic", Easing::EaseInOutCubic),
    ("easeInQuart", Easing::EaseInQuart),
    ("easeOutQuart", Easing::EaseOutQuart),
    ("easeInOutQuart", Easing::EaseInOutQuart),
    ("easeInQuint", Easing::EaseInQuint),
    ("easeOutQuint", Easing::EaseOutQuint),
    ("easeInOutQuint", Easing::EaseInOutQuint),
    ("easeInExpo", Easing::EaseInExpo),
    ("easeOutExpo", Easing::EaseOutExpo),
    ("easeInOutExpo", Easing::EaseInOutExpo),
    ("easeInCirc", Easing::EaseInCirc),
    ("easeOutCirc", Easing::EaseOutCirc),
    ("easeInOutCirc", Easing::EaseInOutCirc),
    ("easeInBack", Easing::EaseInBack),
    ("easeOutBack", Easing::EaseOutBack),
    ("easeInOutBack", Easing::EaseInOutBack),
    ("easeInElastic", Easing::EaseInElastic),
    ("easeOutElastic", Easing::EaseOutElastic),
    ("easeInOutElastic", Easing::EaseInOutElastic),
    ("easeInBounce", Easing::EaseInBounce),
    ("easeOutBounce", Easing::EaseOutBounce),
    ("easeInOutBounce", Easing::EaseInOutBounce),
];

/// CSS `transition-timing-function` keywords
const CSS_KEYWORDS: [(&str, Easing); 6] = [
    ("ease", Easing::CubicBezier(0.25, 0.1, 0.25, 1.0)),
    ("ease-in", Easing::CubicBezier(0.42, 0.0, 1.0, 1.0)),
    ("ease-out", Easing::CubicBezier(0.0, 0.0, 0.58, 1.0)),
    ("ease-in-out", Easing::CubicBezier(0.42, 0.0, 0.58, 1.0)),
    ("step-start", Easing::Steps(1, StepPosition::Start)),
    ("step-end", Easing::Steps(1, StepPosition::End)),
];

impl Easing {
    /// Wrap a closure as an easing
    pub fn custom<F>(name: &str, func: F) -> Self
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        Easing::Custom(CustomEasing {
            name: Arc::from(name),
            func: Arc::new(func),
        })
    }

    /// Look up a name in the built-in catalog
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        EasingRegistry::builtin().resolve(name)
    }

    /// Every built-in catalog entry
    pub fn catalog() -> impl Iterator<Item = (&'static str, Easing)> {
        CATALOG.into_iter()
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        match self {
            Easing::Custom(custom) => return (custom.func)(t),
            // A start-positioned step is already up at t = 0
            Easing::Steps(steps, position) => return apply_steps(t, *steps, *position),
            _ => {}
        }

        // Endpoints are always exact
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match self {
            Easing::Linear => t,
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t.powi(4),
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInQuint => t.powi(5),
            Easing::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::EaseInOutQuint => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::EaseInExpo => 2f32.powf(10.0 * t - 10.0),
            Easing::EaseOutExpo => 1.0 - 2f32.powf(-10.0 * t),
            Easing::EaseInOutExpo => {
                if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Easing::EaseInCirc => 1.0 - (1.0 - t * t).sqrt(),
            Easing::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Easing::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Easing::EaseInBack => C3 * t * t * t - C1 * t * t,
            Easing::EaseOutBack => 1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2),
            Easing::EaseInOutBack => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
            Easing::EaseInElastic => {
                -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * C4).sin()
            }
            Easing::EaseOutElastic => {
                2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
            }
            Easing::EaseInOutElastic => {
                if t < 0.5 {
                    -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0
                } else {
                    (2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }
            Easing::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::EaseInOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => {
                let x = BezierAxis::new(*x1, *x2);
                let y = BezierAxis::new(*y1, *y2);
                y.sample(x.solve(f64::from(t))) as f32
            }
            Easing::Steps(steps, position) => apply_steps(t, *steps, *position),
            Easing::Custom(custom) => (custom.func)(t),
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::CubicBezier(x1, y1, x2, y2) => f
                .debug_tuple("CubicBezier")
                .field(x1)
                .field(y1)
                .field(x2)
                .field(y2)
                .finish(),
            Easing::Steps(steps, position) => {
                f.debug_tuple("Steps").field(steps).field(position).finish()
            }
            Easing::Custom(custom) => f.debug_tuple("Custom").field(&custom.name).finish(),
            other => {
                let name = CATALOG
                    .iter()
                    .find(|(_, e)| e.same_builtin(other))
                    .map_or("?", |(name, _)| *name);
                f.write_str(name)
            }
        }
    }
}

impl Easing {
    fn same_builtin(&self, other: &Easing) -> bool {
        !matches!(self, Easing::Custom(_) | Easing::CubicBezier(..) | Easing::Steps(..))
            && std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

fn apply_steps(t: f32, steps: u32, position: StepPosition) -> f32 {
    let steps = steps.max(1) as f32;
    let t = t.clamp(0.0, 1.0);
    let mut step = (t * steps).floor();
    if position == StepPosition::Start {
        step += 1.0;
    }
    step.min(steps) / steps
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// One axis of a CSS cubic bezier with fixed end points at 0 and 1,
/// stored as polynomial coefficients `((a·p + b)·p + c)·p`.
#[derive(Clone, Copy)]
struct BezierAxis {
    a: f64,
    b: f64,
    c: f64,
}

impl BezierAxis {
    fn new(p1: f32, p2: f32) -> Self {
        let (p1, p2) = (f64::from(p1), f64::from(p2));
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        Self {
            a: 1.0 - c - b,
            b,
            c,
        }
    }

    fn sample(&self, p: f64) -> f64 {
        ((self.a * p + self.b) * p + self.c) * p
    }

    fn derivative(&self, p: f64) -> f64 {
        (3.0 * self.a * p + 2.0 * self.b) * p + self.c
    }

    /// Parameter `p` in [0, 1] where `sample(p) == x`.
    ///
    /// A few Newton steps usually land; flat slopes fall back to bisection.
    fn solve(&self, x: f64) -> f64 {
        const EPSILON: f64 = 1e-7;

        let mut p = x;
        for _ in 0..8 {
            let error = self.sample(p) - x;
            if error.abs() < EPSILON {
                return p;
            }
            let slope = self.derivative(p);
            if slope.abs() < EPSILON {
                break;
            }
            p -= error / slope;
        }

        let (mut low, mut high) = (0.0_f64, 1.0_f64);
        p = x;
        for _ in 0..32 {
            let value = self.sample(p);
            if (value - x).abs() < EPSILON {
                break;
            }
            if value < x {
                low = p;
            } else {
                high = p;
            }
            p = low + (high - low) / 2.0;
        }
        p
    }
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// `cubic-bezier(x1, y1, x2, y2)`
fn cubic_bezier_fn(input: &str) -> IResult<&str, (f32, f32, f32, f32)> {
    let (input, _) = tag_no_case("cubic-bezier")(input)?;
    let (input, _) = tuple((multispace0, char('('), multispace0))(input)?;
    let (input, (x1, _, y1, _, x2, _, y2)) =
        tuple((float, comma, float, comma, float, comma, float))(input)?;
    let (input, _) = tuple((multispace0, char(')')))(input)?;
    Ok((input, (x1, y1, x2, y2)))
}

/// `steps(n)` or `steps(n, start|end)`; the position defaults to `end`
fn steps_fn(input: &str) -> IResult<&str, (u32, StepPosition)> {
    let position = alt((
        value(StepPosition::Start, alt((tag_no_case("jump-start"), tag_no_case("start")))),
        value(StepPosition::End, alt((tag_no_case("jump-end"), tag_no_case("end")))),
    ));
    let (input, _) = tag_no_case("steps")(input)?;
    let (input, _) = tuple((multispace0, char('('), multispace0))(input)?;
    let (input, (steps, position)) = tuple((step_count, opt(preceded(comma, position))))(input)?;
    let (input, _) = tuple((multispace0, char(')')))(input)?;
    Ok((input, (steps, position.unwrap_or(StepPosition::End))))
}

fn parse_steps(input: &str) -> Result<Easing, ConfigurationError> {
    let (_, (steps, position)) = all_consuming(steps_fn)(input)
        .map_err(|_| ConfigurationError::UnknownEasing(input.to_string()))?;
    if steps == 0 {
        return Err(ConfigurationError::InvalidSteps(input.to_string()));
    }
    Ok(Easing::Steps(steps, position))
}

fn parse_cubic_bezier(input: &str) -> Result<Easing, ConfigurationError> {
    let (_, (x1, y1, x2, y2)) = all_consuming(cubic_bezier_fn)(input)
        .map_err(|_| ConfigurationError::UnknownEasing(input.to_string()))?;
    if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
        return Err(ConfigurationError::InvalidCubicBezier(input.to_string()));
    }
    Ok(Easing::CubicBezier(x1, y1, x2, y2))
}

/// Name-to-easing lookup table
#[derive(Clone, Debug)]
pub struct EasingRegistry {
    entries: FxHashMap<String, Easing>,
}

static BUILTIN: OnceLock<EasingRegistry> = OnceLock::new();

impl EasingRegistry {
    /// The process-wide built-in catalog
    pub fn builtin() -> &'static EasingRegistry {
        BUILTIN.get_or_init(|| {
            let entries = CATALOG
                .into_iter()
                .chain(CSS_KEYWORDS)
                .map(|(name, easing)| (name.to_string(), easing))
                .collect();
            EasingRegistry { entries }
        })
    }

    /// A fresh registry seeded with the built-in catalog
    pub fn with_builtins() -> Self {
        Self::builtin().clone()
    }

    /// Builder: add (or shadow) a named custom easing
    pub fn register<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                tracing::debug!("easing `{}` shadowed by custom registration", name);
                slot.insert(Easing::custom(name, func));
            }
            Entry::Vacant(slot) => {
                slot.insert(Easing::custom(name, func));
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Easing> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a name, a `cubic-bezier(...)` or a `steps(...)` expression
    pub fn resolve(&self, name: &str) -> Result<Easing, ConfigurationError> {
        let name = name.trim();
        if let Some(easing) = self.entries.get(name) {
            return Ok(easing.clone());
        }
        if name
            .get(..12)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("cubic-bezier"))
        {
            return parse_cubic_bezier(name);
        }
        if name
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("steps"))
        {
            return parse_steps(name);
        }
        Err(ConfigurationError::UnknownEasing(name.to_string()))
    }
}

impl Default for EasingRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::str::FromStr for Easing {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Easing::from_name(s)
    }
}
