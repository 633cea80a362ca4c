//! `keyframes`: play a keyframe list on every selected element
//!
//! Each element gets one run. The driver only counts iterations: it moves a
//! scalar from 0 to the iteration count with linear timing, and every frame
//! maps that count to a directed, eased progress. Each property is a track of
//! offset-sorted stops; the stop pair around the progress is blended with the
//! easing of the earlier stop.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use sel_animation::{Easing, EasingRegistry, EasingSpec, FrameOptions, InterpolationRequest, RunGroup, RunState};
use sel_core::color::{array_to_color, color_to_array};

use crate::document::{Document, NodeId};
use crate::error::{DomError, Result};
use crate::selection::Selection;
use crate::style::{CssProperties, CssScalar, CssValue};

/// One keyframe: declarations plus where they sit on the timeline
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Keyframe {
    /// Position in `0..=1`; spread evenly between neighbours when omitted
    #[serde(default)]
    pub offset: Option<f32>,
    /// Timing of the segment starting at this keyframe
    #[serde(default)]
    pub easing: Option<EasingSpec>,
    #[serde(flatten)]
    pub properties: CssProperties,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<CssScalar>),
    One(CssScalar),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<CssScalar> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyframesJson {
    List(Vec<Keyframe>),
    Indexed(IndexMap<String, OneOrMany>),
}

impl Keyframe {
    pub fn new(properties: CssProperties) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn at(mut self, offset: f32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_easing(mut self, easing: impl Into<EasingSpec>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Parse keyframes from JSON.
    ///
    /// Accepts a list of keyframe objects, a property-indexed object such as
    /// `{"opacity": [0, 1], "offset": [0, 1]}`, or `null` for no keyframes.
    pub fn list_from_json(json: &str) -> Result<Vec<Keyframe>> {
        match serde_json::from_str::<Option<KeyframesJson>>(json)? {
            None => Ok(Vec::new()),
            Some(KeyframesJson::List(frames)) => Ok(frames),
            Some(KeyframesJson::Indexed(map)) => from_indexed(map),
        }
    }
}

fn scalar_offset(value: CssScalar) -> Result<f32> {
    match value {
        CssScalar::Number(number) => Ok(number as f32),
        CssScalar::Text(text) => text.trim().parse().map_err(|_| DomError::InvalidOption {
            name: "offset",
            reason: format!("`{}` is not a number", text),
        }),
    }
}

fn from_indexed(map: IndexMap<String, OneOrMany>) -> Result<Vec<Keyframe>> {
    let mut offsets = None;
    let mut easings = Vec::new();
    let mut properties = Vec::new();
    for (name, values) in map {
        let values = values.into_vec();
        match name.as_str() {
            "offset" => {
                offsets = Some(values.into_iter().map(scalar_offset).collect::<Result<Vec<_>>>()?)
            }
            "easing" => {
                easings = values
                    .into_iter()
                    .map(|value| EasingSpec::from(value.into_string()))
                    .collect()
            }
            _ => properties.push((name, values)),
        }
    }

    let mut frames = Vec::new();
    for (name, values) in properties {
        let count = values.len();
        for (index, value) in values.into_iter().enumerate() {
            let offset = match &offsets {
                Some(list) if list.len() == count => list[index],
                _ if count == 1 => 1.0,
                _ => index as f32 / (count - 1) as f32,
            };
            frames.push(Keyframe {
                offset: Some(offset),
                easing: (!easings.is_empty()).then(|| easings[index % easings.len()].clone()),
                properties: CssProperties::new().with(&name, value.into_string()),
            });
        }
    }
    frames.sort_by(|a, b| a.offset.unwrap_or(0.0).total_cmp(&b.offset.unwrap_or(0.0)));
    Ok(frames)
}

/// Fill in missing offsets.
///
/// Explicit offsets must lie in `0..=1` and never decrease. A lone keyframe
/// defaults to 1, otherwise the ends default to 0 and 1 and the gaps between
/// known offsets are split evenly.
fn compute_offsets(frames: &[Keyframe]) -> Result<Vec<f32>> {
    let mut previous = 0.0;
    for offset in frames.iter().filter_map(|frame| frame.offset) {
        if !(0.0..=1.0).contains(&offset) || offset < previous {
            return Err(DomError::InvalidOption {
                name: "offset",
                reason: format!("{} is out of range or out of order", offset),
            });
        }
        previous = offset;
    }

    let mut offsets: Vec<Option<f32>> = frames.iter().map(|frame| frame.offset).collect();
    let count = offsets.len();
    if count == 1 {
        offsets[0].get_or_insert(1.0);
    } else if count > 1 {
        offsets[0].get_or_insert(0.0);
        offsets[count - 1].get_or_insert(1.0);
    }

    let mut known = 0;
    for index in 1..count {
        let (Some(start), Some(end)) = (offsets[known], offsets[index]) else {
            continue;
        };
        let gap = (index - known) as f32;
        for (step, slot) in offsets[known + 1..index].iter_mut().enumerate() {
            *slot = Some(start + (end - start) * (step + 1) as f32 / gap);
        }
        known = index;
    }
    Ok(offsets.into_iter().map(|offset| offset.unwrap_or(1.0)).collect())
}

/// Playback direction per iteration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackDirection {
    #[default]
    Normal,
    Reverse,
    Alternate,
    AlternateReverse,
}

/// What stays on the element outside the active interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    /// Restore the previous inline values when the run ends
    #[default]
    #[serde(alias = "auto")]
    None,
    /// Keep the final frame
    Forwards,
    /// Show the first frame during the delay
    Backwards,
    Both,
}

impl FillMode {
    fn holds_end(self) -> bool {
        matches!(self, FillMode::Forwards | FillMode::Both)
    }

    fn holds_start(self) -> bool {
        matches!(self, FillMode::Backwards | FillMode::Both)
    }
}

/// Options for [`Selection::keyframes`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyframeOptions {
    /// Milliseconds per iteration
    pub duration: f64,
    /// Applied once, before the first iteration
    pub delay: f64,
    /// Timing over each whole iteration
    #[serde(alias = "ease")]
    pub easing: EasingSpec,
    /// Number of iterations; -1 repeats forever
    pub iterations: i32,
    pub direction: PlaybackDirection,
    pub fill: FillMode,
}

impl Default for KeyframeOptions {
    fn default() -> Self {
        Self {
            duration: 0.0,
            delay: 0.0,
            easing: EasingSpec::default(),
            iterations: 1,
            direction: PlaybackDirection::Normal,
            fill: FillMode::None,
        }
    }
}

/// Options given as a bare duration or as an object
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyframeOptionsJson {
    Duration(f64),
    Options(KeyframeOptions),
}

impl From<f64> for KeyframeOptions {
    fn from(duration: f64) -> Self {
        Self::new().with_duration(duration)
    }
}

impl KeyframeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(match serde_json::from_str(json)? {
            KeyframeOptionsJson::Duration(duration) => Self::from(duration),
            KeyframeOptionsJson::Options(options) => options,
        })
    }

    pub fn with_duration(mut self, ms: f64) -> Self {
        self.duration = ms;
        self
    }

    pub fn with_delay(mut self, ms: f64) -> Self {
        self.delay = ms;
        self
    }

    pub fn with_easing(mut self, easing: impl Into<EasingSpec>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn with_iterations(mut self, iterations: i32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_direction(mut self, direction: PlaybackDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    fn timing(&self, registry: &EasingRegistry) -> Result<Timing> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(DomError::InvalidOption {
                name: "duration",
                reason: format!("must be a non-negative number, got {}", self.duration),
            });
        }
        let iterations = match self.iterations {
            -1 => None,
            n if n >= 1 => Some(n as u32),
            n => {
                return Err(DomError::InvalidOption {
                    name: "iterations",
                    reason: format!("must be positive or -1, got {}", n),
                })
            }
        };
        Ok(Timing {
            iterations,
            direction: self.direction,
            easing: self.easing.resolve(registry)?,
        })
    }

    /// The driver counts iterations: `0 → n` over `n` durations, or one
    /// endlessly replayed `0 → 1` leg that yoyos for alternating directions.
    fn frame_options(&self, timing: &Timing) -> FrameOptions {
        let alternate = matches!(
            timing.direction,
            PlaybackDirection::Alternate | PlaybackDirection::AlternateReverse
        );
        let (to, duration, replay) = match timing.iterations {
            Some(count) => (count as f32, self.duration * f64::from(count), 0),
            None => (1.0, self.duration, -1),
        };
        FrameOptions::new(to)
            .with_from(0.0_f32)
            .with_duration(duration)
            .with_delay(self.delay)
            .with_delay_once(true)
            .with_easing("linear")
            .with_yoyo(alternate && timing.iterations.is_none())
            .with_replay(replay)
    }
}

/// Maps the driver's iteration count to keyframe progress
struct Timing {
    /// `None` repeats forever
    iterations: Option<u32>,
    direction: PlaybackDirection,
    easing: Easing,
}

impl Timing {
    fn progress(&self, value: f32) -> f32 {
        let (iteration, local) = match self.iterations {
            Some(count) => {
                let last = count.saturating_sub(1) as f32;
                let iteration = value.floor().clamp(0.0, last);
                (iteration as u32, value - iteration)
            }
            None => (0, value),
        };
        let reversed = match self.direction {
            PlaybackDirection::Normal => false,
            PlaybackDirection::Reverse => true,
            PlaybackDirection::Alternate => iteration % 2 == 1,
            PlaybackDirection::AlternateReverse => iteration % 2 == 0,
        };
        self.easing.apply(if reversed { 1.0 - local } else { local })
    }
}

#[derive(Clone, Debug)]
struct Stop {
    offset: f32,
    text: String,
    values: Vec<f32>,
    easing: Easing,
}

#[derive(Clone, Debug)]
enum TrackKind {
    Numeric(CssValue),
    Color,
    /// Switches halfway through each segment
    Discrete,
}

#[derive(Clone, Debug)]
struct Track {
    property: String,
    kind: TrackKind,
    stops: Vec<Stop>,
}

impl Track {
    /// Stops are padded to cover `0..=1`; missing ends take the element's
    /// current inline value, or the nearest stop when it has none.
    fn build(property: &str, mut stops: Vec<Stop>, current: Option<&str>) -> Option<Self> {
        let first = stops.first()?.clone();
        if first.offset > 0.0 {
            stops.insert(0, implicit_stop(0.0, current.unwrap_or(&first.text)));
        }
        let last = stops.last()?.clone();
        if last.offset < 1.0 {
            stops.push(implicit_stop(1.0, current.unwrap_or(&last.text)));
        }

        let colors: std::result::Result<Vec<_>, _> =
            stops.iter().map(|stop| color_to_array(&stop.text)).collect();
        let kind = if let Ok(colors) = colors {
            for (stop, rgba) in stops.iter_mut().zip(colors) {
                stop.values = rgba.to_vec();
            }
            TrackKind::Color
        } else {
            let template = CssValue::parse(&stops.last()?.text);
            let aligned: Result<Vec<_>> = stops
                .iter()
                .map(|stop| template.align(property, &stop.text))
                .collect();
            match aligned {
                Ok(values) if template.is_numeric() => {
                    for (stop, values) in stops.iter_mut().zip(values) {
                        stop.values = values;
                    }
                    TrackKind::Numeric(template)
                }
                _ => TrackKind::Discrete,
            }
        };

        Some(Self {
            property: property.to_string(),
            kind,
            stops,
        })
    }

    fn sample(&self, progress: f32) -> String {
        if self.stops.len() < 2 {
            return self.stops.first().map(|stop| stop.text.clone()).unwrap_or_default();
        }
        // Equal offsets hand over at the later stop
        let index = self
            .stops
            .iter()
            .rposition(|stop| stop.offset <= progress)
            .unwrap_or(0)
            .min(self.stops.len() - 2);
        let (a, b) = (&self.stops[index], &self.stops[index + 1]);

        let span = b.offset - a.offset;
        let local = if span > 0.0 { (progress - a.offset) / span } else { 1.0 };
        let eased = a.easing.apply(local);
        let blend = |from: &[f32], to: &[f32]| -> Vec<f32> {
            from.iter().zip(to).map(|(x, y)| x + (y - x) * eased).collect()
        };

        match &self.kind {
            TrackKind::Numeric(template) => template.format(&blend(&a.values, &b.values)),
            TrackKind::Color => {
                let mixed = blend(&a.values, &b.values);
                let mut rgba = [0.0; 4];
                for (channel, value) in rgba.iter_mut().zip(mixed) {
                    *channel = value;
                }
                array_to_color(&rgba)
            }
            TrackKind::Discrete if eased < 0.5 => a.text.clone(),
            TrackKind::Discrete => b.text.clone(),
        }
    }
}

fn implicit_stop(offset: f32, text: &str) -> Stop {
    Stop {
        offset,
        text: text.to_string(),
        values: Vec::new(),
        easing: Easing::Linear,
    }
}

/// Stops per property, before padding with an element's current values
fn raw_tracks(frames: &[Keyframe], registry: &EasingRegistry) -> Result<IndexMap<String, Vec<Stop>>> {
    let offsets = compute_offsets(frames)?;
    let mut tracks: IndexMap<String, Vec<Stop>> = IndexMap::new();
    for (frame, offset) in frames.iter().zip(offsets) {
        let easing = match &frame.easing {
            Some(easing) => easing.resolve(registry)?,
            None => Easing::Linear,
        };
        for (property, value) in frame.properties.iter() {
            tracks.entry(property.to_string()).or_default().push(Stop {
                offset,
                text: value.to_string(),
                values: Vec::new(),
                easing: easing.clone(),
            });
        }
    }
    Ok(tracks)
}

struct KeyframePlan {
    node: NodeId,
    tracks: Vec<Track>,
    /// Inline values to put back when the effect is removed
    previous: Vec<(String, Option<String>)>,
}

fn plan_element(doc: &Document, node: NodeId, raw: &IndexMap<String, Vec<Stop>>) -> Option<KeyframePlan> {
    let element = doc.element(node)?;
    let mut tracks = Vec::with_capacity(raw.len());
    let mut previous = Vec::with_capacity(raw.len());
    for (property, stops) in raw {
        let current = element.style(property);
        previous.push((property.clone(), current.map(str::to_string)));
        tracks.extend(Track::build(property, stops.clone(), current));
    }
    Some(KeyframePlan {
        node,
        tracks,
        previous,
    })
}

fn write_frame(doc: &mut Document, node: NodeId, tracks: &[Track], progress: f32) {
    if let Some(element) = doc.element_mut(node) {
        for track in tracks {
            element.set_style(&track.property, &track.sample(progress));
        }
    }
}

impl Selection {
    /// Play `frames` on every selected element.
    ///
    /// Colors and values whose numbers and units line up are interpolated;
    /// anything else flips at the middle of its segment. Unless `fill` holds
    /// the end, the previous inline values come back once the run completes
    /// or is cancelled. Invalid offsets or options write nothing.
    pub fn keyframes(&self, frames: &[Keyframe], options: &KeyframeOptions) -> Result<RunGroup> {
        let registry = self.page().scheduler().registry();
        let timing = options.timing(registry)?;
        let raw = raw_tracks(frames, registry)?;
        if raw.is_empty() {
            tracing::trace!("keyframes: nothing to animate");
            return Ok(RunGroup::new());
        }
        let request = InterpolationRequest::resolve(&options.frame_options(&timing), registry)?;
        let timing = std::sync::Arc::new(timing);

        let plans: Vec<KeyframePlan> = {
            let doc = self.page().document();
            self.live(&doc, "keyframes")
                .into_iter()
                .filter_map(|node| plan_element(&doc, node, &raw))
                .collect()
        };

        let mut group = RunGroup::new();
        for plan in plans {
            let KeyframePlan {
                node,
                tracks,
                previous,
            } = plan;
            if options.fill.holds_start() {
                write_frame(&mut self.page().document(), node, &tracks, timing.progress(0.0));
            }

            let fill = options.fill;
            let frame_timing = timing.clone();
            let handle = self.page().schedule_on_node(
                node,
                request.clone(),
                move |doc, tick| {
                    write_frame(doc, node, &tracks, frame_timing.progress(tick.value()));
                    None
                },
                move |doc, state| {
                    if state == RunState::Completed && fill.holds_end() {
                        return;
                    }
                    if let Some(element) = doc.element_mut(node) {
                        for (property, value) in &previous {
                            match value {
                                Some(value) => element.set_style(property, value),
                                None => {
                                    element.remove_style(property);
                                }
                            }
                        }
                    }
                },
            );
            group.push(handle);
        }

        tracing::debug!("keyframes: {} run(s) started", group.len());
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use pretty_assertions::assert_eq;
    use sel_animation::ManualClock;

    fn page_with_box() -> (Page, ManualClock) {
        let (page, clock) = Page::headless();
        {
            let mut doc = page.document();
            let body = doc.body();
            let div = doc.append_element(body, "div").unwrap();
            doc.element_mut(div).unwrap().set_attribute("id", "box");
        }
        (page, clock)
    }

    fn frame(offset: Option<f32>) -> Keyframe {
        Keyframe {
            offset,
            ..Keyframe::default()
        }
    }

    #[test]
    fn test_missing_offsets_are_spread() {
        let frames = [frame(None), frame(None), frame(Some(0.8)), frame(None)];
        assert_eq!(compute_offsets(&frames).unwrap(), vec![0.0, 0.4, 0.8, 1.0]);
        assert_eq!(compute_offsets(&[frame(None)]).unwrap(), vec![1.0]);
        assert_eq!(compute_offsets(&[frame(None), frame(None)]).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_bad_offsets_rejected() {
        for frames in [
            vec![frame(Some(0.5)), frame(Some(0.2))],
            vec![frame(Some(1.5))],
            vec![frame(Some(f32::NAN))],
        ] {
            assert!(matches!(
                compute_offsets(&frames),
                Err(DomError::InvalidOption { name: "offset", .. })
            ));
        }
    }

    #[test]
    fn test_list_and_property_indexed_json() {
        let list = Keyframe::list_from_json(
            r#"[{"opacity": 0}, {"opacity": 0.5, "offset": 0.8, "easing": "ease-in"}, {"opacity": 1}]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].offset, Some(0.8));
        assert!(matches!(&list[1].easing, Some(EasingSpec::Named(name)) if name == "ease-in"));
        assert_eq!(list[1].properties.get("opacity"), Some("0.5"));
        assert!(!list[1].properties.contains("offset"));

        let indexed = Keyframe::list_from_json(
            r#"{"opacity": [0, 1], "marginLeft": ["0px", "50px", "100px"], "easing": "ease-out"}"#,
        )
        .unwrap();
        let offsets: Vec<_> = indexed.iter().map(|frame| frame.offset.unwrap()).collect();
        assert_eq!(offsets, vec![0.0, 0.0, 0.5, 1.0, 1.0]);
        assert_eq!(indexed[2].properties.get("margin-left"), Some("50px"));
        assert!(indexed.iter().all(|frame| frame.easing.is_some()));

        assert!(Keyframe::list_from_json("null").unwrap().is_empty());
        assert!(matches!(Keyframe::list_from_json("[1, 2]"), Err(DomError::Options(_))));
    }

    #[test]
    fn test_options_from_number_or_object() {
        let options = KeyframeOptions::from_json("250").unwrap();
        assert_eq!(options.duration, 250.0);
        assert_eq!(options.iterations, 1);

        let options = KeyframeOptions::from_json(
            r#"{"duration": 400, "iterations": -1, "direction": "alternate-reverse", "fill": "both"}"#,
        )
        .unwrap();
        assert_eq!(options.iterations, -1);
        assert_eq!(options.direction, PlaybackDirection::AlternateReverse);
        assert_eq!(options.fill, FillMode::Both);

        let auto = KeyframeOptions::from_json(r#"{"fill": "auto"}"#).unwrap();
        assert_eq!(auto.fill, FillMode::None);
    }

    #[test]
    fn test_middle_stop_shapes_the_segments() {
        let (page, clock) = page_with_box();
        let sel = page.select("#box").unwrap();
        let frames = [
            Keyframe::new(CssProperties::from([("width", "0px")])),
            Keyframe::new(CssProperties::from([("width", "100px")])).at(0.5),
            Keyframe::new(CssProperties::from([("width", "0px")])),
        ];
        let group = sel
            .keyframes(&frames, &KeyframeOptions::new().with_duration(100.0))
            .unwrap();
        assert_eq!(group.len(), 1);

        page.tick();
        assert_eq!(sel.get_style("width").as_deref(), Some("0px"));
        clock.advance(25.0);
        page.tick();
        assert_eq!(sel.get_style("width").as_deref(), Some("50px"));
        clock.advance(25.0);
        page.tick();
        assert_eq!(sel.get_style("width").as_deref(), Some("100px"));
        clock.advance(25.0);
        page.tick();
        assert_eq!(sel.get_style("width").as_deref(), Some("50px"));

        page.run_frames(&clock, 16.0, 100);
        assert!(group.is_finished());
        assert_eq!(sel.get_style("width"), None);
    }

    #[test]
    fn test_alternate_iterations_end_reversed() {
        let (page, clock) = page_with_box();
        let sel = page.select("#box").unwrap();
        let frames = Keyframe::list_from_json(r#"{"opacity": [0, 1]}"#).unwrap();
        let group = sel
            .keyframes(
                &frames,
                &KeyframeOptions::new()
                    .with_duration(100.0)
                    .with_iterations(3)
                    .with_direction(PlaybackDirection::Alternate)
                    .with_fill(FillMode::Forwards),
            )
            .unwrap();

        page.tick();
        clock.advance(150.0);
        page.tick();
        assert_eq!(sel.get_style("opacity").as_deref(), Some("0.5"));
        clock.advance(75.0);
        page.tick();
        assert_eq!(sel.get_style("opacity").as_deref(), Some("0.25"));

        page.run_frames(&clock, 16.0, 100);
        assert_eq!(group.handles()[0].state(), RunState::Completed);
        assert_eq!(sel.get_style("opacity").as_deref(), Some("1"));
    }

    #[test]
    fn test_color_and_discrete_tracks() {
        let (page, clock) = page_with_box();
        let sel = page.select("#box").unwrap();
        let frames = [
            Keyframe::new(CssProperties::from([
                ("backgroundColor", "rgb(255, 0, 0)"),
                ("visibility", "visible"),
            ])),
            Keyframe::new(CssProperties::from([
                ("backgroundColor", "rgb(0, 0, 255)"),
                ("visibility", "hidden"),
            ])),
        ];
        sel.keyframes(
            &frames,
            &KeyframeOptions::new()
                .with_duration(100.0)
                .with_fill(FillMode::Forwards),
        )
        .unwrap();

        page.tick();
        clock.advance(25.0);
        page.tick();
        assert_eq!(sel.get_style("visibility").as_deref(), Some("visible"));
        clock.advance(25.0);
        page.tick();
        assert_eq!(
            sel.get_style("background-color").as_deref(),
            Some("rgba(128, 0, 128, 1)")
        );
        assert_eq!(sel.get_style("visibility").as_deref(), Some("hidden"));

        page.run_frames(&clock, 16.0, 100);
        assert_eq!(
            sel.get_style("background-color").as_deref(),
            Some("rgba(0, 0, 255, 1)")
        );
    }

    #[test]
    fn test_missing_start_uses_current_inline_value() {
        let (page, clock) = page_with_box();
        let sel = page.select("#box").unwrap();
        sel.css(&CssProperties::from([("width", "40px")]));

        let frames = [Keyframe::new(CssProperties::from([("width", "100px")]))];
        let group = sel
            .keyframes(&frames, &KeyframeOptions::new().with_duration(100.0))
            .unwrap();
        page.tick();
        clock.advance(50.0);
        page.tick();
        assert_eq!(sel.get_style("width").as_deref(), Some("70px"));

        page.run_frames(&clock, 16.0, 100);
        assert!(group.is_finished());
        assert_eq!(sel.get_style("width").as_deref(), Some("40px"));
    }

    #[test]
    fn test_backwards_fill_and_cancel_restore() {
        let (page, _clock) = page_with_box();
        let sel = page.select("#box").unwrap();
        let frames = Keyframe::list_from_json(r#"[{"opacity": 0.2}, {"opacity": 1}]"#).unwrap();
        let group = sel
            .keyframes(
                &frames,
                &KeyframeOptions::new()
                    .with_duration(100.0)
                    .with_delay(500.0)
                    .with_iterations(-1)
                    .with_fill(FillMode::Backwards),
            )
            .unwrap();
        assert_eq!(sel.get_style("opacity").as_deref(), Some("0.2"));

        group.cancel();
        page.tick();
        assert_eq!(group.handles()[0].state(), RunState::Cancelled);
        assert_eq!(sel.get_style("opacity"), None);
    }

    #[test]
    fn test_invalid_options_write_nothing() {
        let (page, _) = page_with_box();
        let sel = page.select("#box").unwrap();
        let frames = [Keyframe::new(CssProperties::from([("width", "10px")]))];

        for options in [
            KeyframeOptions::new().with_iterations(0),
            KeyframeOptions::new().with_duration(f64::NAN),
            KeyframeOptions::new().with_easing("bogus"),
        ] {
            assert!(sel.keyframes(&frames, &options).is_err());
        }
        let unordered = [
            Keyframe::new(CssProperties::from([("width", "10px")])).at(0.9),
            Keyframe::new(CssProperties::from([("width", "20px")])).at(0.1),
        ];
        assert!(sel.keyframes(&unordered, &KeyframeOptions::new()).is_err());

        assert_eq!(sel.get_style("width"), None);
        assert!(!page.scheduler().has_active_runs());
        assert!(sel.keyframes(&[], &KeyframeOptions::new()).unwrap().is_empty());
    }
}
