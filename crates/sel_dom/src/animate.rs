//! `animate`: tween inline CSS properties of every selected element
//!
//! Each element gets one run. All of its tweened properties are packed into a
//! single value vector, so they share one clock and one easing; every frame
//! the vector is unpacked and written back with the original units.

use serde::{Deserialize, Serialize};

use sel_animation::{
    EasingSpec, FrameOptions, InterpolationRequest, RunGroup, RunState, Values,
};
use sel_core::color::{array_to_color, color_to_array, is_color};

use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::selection::Selection;
use crate::style::{property_name, CssProperties, CssValue, TransitionFilter};

/// Options for [`Selection::animate`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimateOptions {
    /// Milliseconds per forward leg
    pub duration: f64,
    pub delay: f64,
    pub delay_once: bool,
    /// Catalog name, CSS timing keyword or `cubic-bezier(...)`
    #[serde(alias = "easing", alias = "easingFunction")]
    pub ease: EasingSpec,
    /// Additional cycles; -1 repeats forever
    pub repeat: i32,
    pub yoyo: bool,
    pub yoyo_duration: Option<f64>,
    pub yoyo_delay: Option<f64>,
    /// Remove the inline styles animate wrote once the run completes
    pub clean_up: bool,
    /// With `clean_up`, hide the element afterwards
    pub display_none: bool,
    /// Comma-separated properties removed before starting
    pub clear_prop: Option<String>,
    /// Comma-separated properties to tween; the rest are set immediately
    pub transition_property: String,
}

fn default_duration() -> f64 {
    300.0
}

fn default_ease() -> EasingSpec {
    EasingSpec::from("ease")
}

fn default_transition_property() -> String {
    "all".to_string()
}

impl Default for AnimateOptions {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            delay: 0.0,
            delay_once: false,
            ease: default_ease(),
            repeat: 0,
            yoyo: false,
            yoyo_duration: None,
            yoyo_delay: None,
            clean_up: false,
            display_none: false,
            clear_prop: None,
            transition_property: default_transition_property(),
        }
    }
}

impl AnimateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
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

    pub fn with_ease(mut self, ease: impl Into<EasingSpec>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn with_repeat(mut self, repeat: i32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn with_clean_up(mut self, clean_up: bool) -> Self {
        self.clean_up = clean_up;
        self
    }

    pub fn with_display_none(mut self, display_none: bool) -> Self {
        self.display_none = display_none;
        self
    }

    pub fn with_clear_prop(mut self, properties: &str) -> Self {
        self.clear_prop = Some(properties.to_string());
        self
    }

    pub fn with_transition_property(mut self, properties: &str) -> Self {
        self.transition_property = properties.to_string();
        self
    }

    fn frame_options(&self, from: Vec<f32>, to: Vec<f32>) -> FrameOptions {
        FrameOptions {
            from: Some(Values::Sequence(from)),
            to: Values::Sequence(to),
            duration: self.duration,
            delay: self.delay,
            delay_once: self.delay_once,
            easing: self.ease.clone(),
            yoyo: self.yoyo,
            yoyo_duration: self.yoyo_duration,
            yoyo_delay: self.yoyo_delay,
            replay: self.repeat,
        }
    }

    fn cleared_properties(&self) -> Vec<String> {
        self.clear_prop
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(property_name)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
enum TrackKind {
    Numeric(CssValue),
    Color,
}

/// One property's slice of the packed value vector
#[derive(Clone, Debug)]
struct Track {
    property: String,
    kind: TrackKind,
    offset: usize,
    len: usize,
}

impl Track {
    fn render(&self, values: &[f32]) -> Option<String> {
        let values = values.get(self.offset..self.offset + self.len)?;
        Some(match &self.kind {
            TrackKind::Numeric(template) => template.format(values),
            TrackKind::Color => array_to_color(&[values[0], values[1], values[2], values[3]]),
        })
    }
}

/// Everything needed to start one element's run, computed before any write
struct ElementPlan {
    node: NodeId,
    tracks: Vec<Track>,
    /// Written when the animation starts
    initial: Vec<(String, String)>,
    /// Written when the animation starts and left alone afterwards
    immediate: Vec<(String, String)>,
    request: InterpolationRequest,
}

impl ElementPlan {
    fn written_properties(&self) -> Vec<String> {
        let mut properties: Vec<String> = self.tracks.iter().map(|t| t.property.clone()).collect();
        for (property, _) in self.initial.iter().chain(&self.immediate) {
            if !properties.contains(property) {
                properties.push(property.clone());
            }
        }
        properties
    }
}

fn plan_element(
    doc: &Document,
    node: NodeId,
    from: &CssProperties,
    to: &CssProperties,
    options: &AnimateOptions,
    filter: &TransitionFilter,
    selection: &Selection,
) -> Result<ElementPlan> {
    let current = |property: &str| doc.element(node).and_then(|el| el.style(property));

    let mut tracks = Vec::new();
    let mut start = Vec::new();
    let mut end = Vec::new();
    let mut initial = Vec::new();
    let mut immediate = Vec::new();

    for (property, target) in to.iter() {
        let explicit = from.get(property);
        if !filter.allows(property) {
            immediate.push((property.to_string(), target.to_string()));
            continue;
        }

        let offset = start.len();
        if is_color(target) {
            let to_rgba = color_to_array(target)?;
            let from_rgba = match explicit {
                Some(value) => color_to_array(value)?,
                None => current(property)
                    .and_then(|value| color_to_array(value).ok())
                    .unwrap_or([0.0; 4]),
            };
            start.extend_from_slice(&from_rgba);
            end.extend_from_slice(&to_rgba);
            tracks.push(Track {
                property: property.to_string(),
                kind: TrackKind::Color,
                offset,
                len: 4,
            });
            if explicit.is_some() {
                initial.push((property.to_string(), array_to_color(&from_rgba)));
            }
            continue;
        }

        let template = CssValue::parse(target);
        if !template.is_numeric() {
            immediate.push((property.to_string(), target.to_string()));
            continue;
        }
        let from_values = match explicit {
            Some(value) => template.align(property, value)?,
            None => current(property)
                .and_then(|value| template.align(property, value).ok())
                .unwrap_or_else(|| vec![0.0; template.count()]),
        };
        if explicit.is_some() {
            initial.push((property.to_string(), template.format(&from_values)));
        }
        start.extend_from_slice(&from_values);
        end.extend(template.numbers());
        tracks.push(Track {
            property: property.to_string(),
            kind: TrackKind::Numeric(template),
            offset,
            len: end.len() - offset,
        });
    }

    // `from` declarations with no counterpart in `to` are plain initial writes
    for (property, value) in from.iter() {
        if !to.contains(property) {
            initial.push((property.to_string(), value.to_string()));
        }
    }

    // Keep a clock running even with nothing to tween, so completion still fires
    if start.is_empty() {
        start.push(0.0);
        end.push(1.0);
    }

    let request = InterpolationRequest::resolve(
        &options.frame_options(start, end),
        selection.page().scheduler().registry(),
    )?;

    Ok(ElementPlan {
        node,
        tracks,
        initial,
        immediate,
        request,
    })
}

impl Selection {
    /// Tween inline styles from `from` to `to` on every selected element.
    ///
    /// Properties missing from `from` start at the element's current inline
    /// value when it is compatible, otherwise at zero in `to`'s units. Values
    /// without numbers (keywords) are set immediately. Nothing is written if
    /// any property or option is invalid.
    pub fn animate(
        &self,
        from: &CssProperties,
        to: &CssProperties,
        options: &AnimateOptions,
    ) -> Result<RunGroup> {
        let filter = TransitionFilter::parse(&options.transition_property);
        let cleared = options.cleared_properties();

        let plans = {
            let doc = self.page().document();
            self.live(&doc, "animate")
                .into_iter()
                .map(|node| plan_element(&doc, node, from, to, options, &filter, self))
                .collect::<Result<Vec<_>>>()?
        };

        let mut group = RunGroup::new();
        for plan in plans {
            {
                let mut doc = self.page().document();
                let Some(element) = doc.element_mut(plan.node) else {
                    continue;
                };
                for property in &cleared {
                    element.remove_style(property);
                }
                for (property, value) in plan.initial.iter().chain(&plan.immediate) {
                    element.set_style(property, value);
                }
            }

            let written = plan.written_properties();
            let tracks = plan.tracks;
            let node = plan.node;
            let clean_up = options.clean_up;
            let display_none = options.display_none;

            let handle = self.page().schedule_on_node(
                node,
                plan.request,
                move |doc, tick| {
                    if let Some(element) = doc.element_mut(node) {
                        for track in &tracks {
                            if let Some(value) = track.render(tick.values()) {
                                element.set_style(&track.property, &value);
                            }
                        }
                    }
                    None
                },
                move |doc, state| {
                    if state != RunState::Completed || !clean_up {
                        return;
                    }
                    if let Some(element) = doc.element_mut(node) {
                        for property in &written {
                            element.remove_style(property);
                        }
                        if display_none {
                            element.set_style("display", "none");
                        }
                    }
                },
            );
            group.push(handle);
        }

        tracing::debug!("animate: {} run(s) started", group.len());
        Ok(group)
    }
}
