//! `scroll_to`: jump or glide scroll containers to a position

use serde::{Deserialize, Serialize};

use sel_animation::{EasingSpec, FrameOptions, InterpolationRequest, RunGroup};
use sel_core::events::event_types;
use sel_core::{EventData, EventType};

use crate::document::{Document, NodeId};
use crate::error::{DomError, Result};
use crate::page::PendingEvent;
use crate::selection::Selection;
use crate::selector::Selector;

/// Destination on one axis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollTarget {
    /// Absolute offset in pixels
    Position(f32),
    /// `"max"`, or a selector whose first match is scrolled to
    Named(String),
    #[serde(skip)]
    Element(NodeId),
}

impl From<f32> for ScrollTarget {
    fn from(position: f32) -> Self {
        ScrollTarget::Position(position)
    }
}

impl From<&str> for ScrollTarget {
    fn from(name: &str) -> Self {
        ScrollTarget::Named(name.to_string())
    }
}

impl From<NodeId> for ScrollTarget {
    fn from(node: NodeId) -> Self {
        ScrollTarget::Element(node)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Jump immediately
    #[default]
    #[serde(alias = "auto", alias = "instant")]
    None,
    /// Tween at `pps`
    Smooth,
}

/// Options for [`Selection::scroll_to`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollToOptions {
    pub x: Option<ScrollTarget>,
    pub y: Option<ScrollTarget>,
    /// Relative move, used when `x` is absent
    pub by_x: Option<f32>,
    /// Relative move, used when `y` is absent
    pub by_y: Option<f32>,
    pub offset_x: f32,
    pub offset_y: f32,
    pub behavior: ScrollBehavior,
    /// Speed of a smooth scroll; the longer axis travels `pps` pixels per second
    pub pps: f32,
    #[serde(alias = "easingFunction")]
    pub easing: EasingSpec,
}

fn default_pps() -> f32 {
    30.0
}

impl Default for ScrollToOptions {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            by_x: None,
            by_y: None,
            offset_x: 0.0,
            offset_y: 0.0,
            behavior: ScrollBehavior::None,
            pps: default_pps(),
            easing: EasingSpec::default(),
        }
    }
}

impl ScrollToOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_x(mut self, x: impl Into<ScrollTarget>) -> Self {
        self.x = Some(x.into());
        self
    }

    pub fn with_y(mut self, y: impl Into<ScrollTarget>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_by(mut self, dx: f32, dy: f32) -> Self {
        self.by_x = Some(dx);
        self.by_y = Some(dy);
        self
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    pub fn smooth(mut self) -> Self {
        self.behavior = ScrollBehavior::Smooth;
        self
    }

    pub fn with_pps(mut self, pps: f32) -> Self {
        self.pps = pps;
        self
    }

    pub fn with_easing(mut self, easing: impl Into<EasingSpec>) -> Self {
        self.easing = easing.into();
        self
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Resolved scroll for one container
struct ScrollPlan {
    node: NodeId,
    current: (f32, f32),
    destination: (f32, f32),
}

/// Selector targets parsed once for every container
enum ResolvedTarget {
    Position(f32),
    Max,
    Element(Option<NodeId>),
}

fn resolve_target(doc: &Document, target: &ScrollTarget) -> Result<ResolvedTarget> {
    Ok(match target {
        ScrollTarget::Position(position) if position.is_finite() => ResolvedTarget::Position(*position),
        ScrollTarget::Position(position) => {
            return Err(DomError::InvalidOption {
                name: "x/y",
                reason: format!("{} is not a finite position", position),
            })
        }
        ScrollTarget::Named(name) if name.trim().eq_ignore_ascii_case("max") => ResolvedTarget::Max,
        ScrollTarget::Named(selector) => {
            let found = Selector::parse(selector)?.query_first(doc);
            if found.is_none() {
                tracing::trace!("scroll_to: `{}` matched nothing", selector);
            }
            ResolvedTarget::Element(found)
        }
        ScrollTarget::Element(node) => ResolvedTarget::Element(doc.element(*node).map(|_| *node)),
    })
}

fn axis_destination(
    doc: &Document,
    container: NodeId,
    axis: Axis,
    target: Option<&ResolvedTarget>,
    by: Option<f32>,
    offset: f32,
) -> Option<f32> {
    let element = doc.element(container)?;
    let (current, max, origin) = match axis {
        Axis::X => (
            element.scroll_left(),
            element.metrics.max_scroll_left(),
            element.metrics.offset_left,
        ),
        Axis::Y => (
            element.scroll_top(),
            element.metrics.max_scroll_top(),
            element.metrics.offset_top,
        ),
    };

    let destination = match (target, by) {
        (Some(ResolvedTarget::Position(position)), _) => *position,
        (Some(ResolvedTarget::Max), _) => max,
        (Some(ResolvedTarget::Element(Some(node))), _) => {
            let metrics = doc.element(*node)?.metrics;
            let position = match axis {
                Axis::X => metrics.offset_left,
                Axis::Y => metrics.offset_top,
            };
            position - origin
        }
        (Some(ResolvedTarget::Element(None)), _) => return Some(current),
        (None, Some(delta)) => current + delta,
        (None, None) => return Some(current),
    };
    Some((destination + offset).clamp(0.0, max))
}

impl Selection {
    /// Scroll every selected container.
    ///
    /// `behavior: none` applies the position at once and returns an empty
    /// group; `smooth` starts one run per container that has somewhere to go.
    /// A `scroll` event fires for every applied position.
    pub fn scroll_to(&self, options: &ScrollToOptions) -> Result<RunGroup> {
        let smooth = options.behavior == ScrollBehavior::Smooth;
        if smooth && !(options.pps.is_finite() && options.pps > 0.0) {
            return Err(DomError::InvalidOption {
                name: "pps",
                reason: format!("must be a positive number, got {}", options.pps),
            });
        }
        for (name, value) in [
            ("byX", options.by_x.unwrap_or(0.0)),
            ("byY", options.by_y.unwrap_or(0.0)),
            ("offsetX", options.offset_x),
            ("offsetY", options.offset_y),
        ] {
            if !value.is_finite() {
                return Err(DomError::InvalidOption {
                    name: "scroll offset",
                    reason: format!("{} is {}", name, value),
                });
            }
        }

        let plans: Vec<ScrollPlan> = {
            let doc = self.page().document();
            let x = options.x.as_ref().map(|t| resolve_target(&doc, t)).transpose()?;
            let y = options.y.as_ref().map(|t| resolve_target(&doc, t)).transpose()?;
            self.live(&doc, "scroll_to")
                .into_iter()
                .filter_map(|node| {
                    let element = doc.element(node)?;
                    let current = (element.scroll_left(), element.scroll_top());
                    let destination = (
                        axis_destination(&doc, node, Axis::X, x.as_ref(), options.by_x, options.offset_x)?,
                        axis_destination(&doc, node, Axis::Y, y.as_ref(), options.by_y, options.offset_y)?,
                    );
                    Some(ScrollPlan {
                        node,
                        current,
                        destination,
                    })
                })
                .collect()
        };

        let scroll = EventType::new(event_types::SCROLL)?;
        if !smooth {
            for plan in plans {
                let applied = {
                    let mut doc = self.page().document();
                    doc.element_mut(plan.node)
                        .map(|el| el.set_scroll_position(plan.destination.0, plan.destination.1))
                };
                if let Some((left, top)) = applied {
                    self.page()
                        .dispatch(plan.node, &scroll, EventData::Scroll { left, top }, false);
                }
            }
            return Ok(RunGroup::new());
        }

        let registry = self.page().scheduler().registry();
        let requests = plans
            .into_iter()
            .filter(|plan| plan.current != plan.destination)
            .map(|plan| {
                let dx = (plan.destination.0 - plan.current.0).abs();
                let dy = (plan.destination.1 - plan.current.1).abs();
                let duration = f64::from(dx.max(dy) / options.pps) * 1000.0;
                let frame = FrameOptions::new([plan.destination.0, plan.destination.1])
                    .with_from([plan.current.0, plan.current.1])
                    .with_duration(duration)
                    .with_easing(options.easing.clone());
                Ok((plan.node, InterpolationRequest::resolve(&frame, registry)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut group = RunGroup::new();
        for (node, request) in requests {
            tracing::debug!("scroll_to: gliding {:?} over {}ms", node, request.duration_ms());
            let event_type = scroll.clone();
            group.push(self.page().schedule_on_node(
                node,
                request,
                move |doc, tick| {
                    let values = tick.values();
                    let (left, top) = doc
                        .element_mut(node)?
                        .set_scroll_position(values[0], values[1]);
                    Some(PendingEvent {
                        event_type: event_type.clone(),
                        data: EventData::Scroll { left, top },
                    })
                },
                |_, _| {},
            ));
        }
        Ok(group)
    }
}
