//! `progress`: circular SVG progress indicator
//!
//! Builds, inside each selected container:
//!
//! ```text
//! svg.sel-progress[viewBox="0 0 100 100"]
//!   defs                       gradient and/or mask, when used
//!   circle.sel-progress-background
//!   circle.sel-progress-track
//!   circle.sel-progress-fill   stroke-dashoffset tracks the value
//!   text.sel-progress-text
//! ```

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use sel_animation::{EasingSpec, FrameOptions, InterpolationRequest, RunGroup, Values};
use sel_core::color::color_to_array;
use sel_core::format_number;

use crate::document::{Document, NodeId};
use crate::error::{DomError, Result};
use crate::selection::Selection;
use crate::style::CssProperties;

/// Stroke color keyword that paints with the two-stop gradient
pub const GRADE: &str = "grade";

/// Line caps accepted for the ring and mask strokes
const LINECAPS: [&str; 8] = [
    "butt", "round", "square", "none", "initial", "inherit", "revert", "unset",
];

/// Driver options for the fill animation; the ring always runs 0 → `input`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressAnimation {
    #[serde(alias = "easingFunction", alias = "ease")]
    pub easing: EasingSpec,
    pub duration: f64,
    pub delay: f64,
    pub yoyo: bool,
    /// Defaults to `duration`
    pub yoyo_duration: Option<f64>,
    /// Defaults to `delay`
    pub yoyo_delay: Option<f64>,
    /// Additional cycles; -1 repeats forever
    pub replay: i32,
}

impl Default for ProgressAnimation {
    fn default() -> Self {
        Self {
            easing: EasingSpec::from("easeOutBack"),
            duration: 2000.0,
            delay: 300.0,
            yoyo: false,
            yoyo_duration: None,
            yoyo_delay: None,
            replay: 0,
        }
    }
}

impl ProgressAnimation {
    fn frame_options(&self, input: f32) -> FrameOptions {
        FrameOptions {
            from: Some(Values::Scalar(0.0)),
            to: Values::Scalar(input),
            duration: self.duration,
            delay: self.delay,
            delay_once: false,
            easing: self.easing.clone(),
            yoyo: self.yoyo,
            yoyo_duration: self.yoyo_duration,
            yoyo_delay: self.yoyo_delay,
            replay: self.replay,
        }
    }
}

/// Options for [`Selection::progress`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressOptions {
    /// Percentage, clamped to 0..=100
    pub input: f32,
    /// Label text; `{input}` is replaced by the value
    pub text: String,
    pub text_style: CssProperties,
    pub text_color: String,
    pub background_color: Option<String>,
    pub stroke_width: f32,
    pub stroke_linecap: String,
    pub stroke_background_color: String,
    /// A color, or `grade` for the gradient
    pub stroke_color: String,
    pub grade_color1: String,
    pub grade_color2: String,
    pub use_mask: bool,
    pub mask_dasharray: f32,
    pub mask_linecap: String,
    pub animation: bool,
    pub animation_options: ProgressAnimation,
    pub clean_before_inject: bool,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            input: 0.0,
            text: "{input}%".to_string(),
            text_style: CssProperties::new(),
            text_color: "#2b2b2b".to_string(),
            background_color: None,
            stroke_width: 10.0,
            stroke_linecap: "round".to_string(),
            stroke_background_color: "lightgrey".to_string(),
            stroke_color: GRADE.to_string(),
            grade_color1: "red".to_string(),
            grade_color2: "orange".to_string(),
            use_mask: false,
            mask_dasharray: 2.0,
            mask_linecap: "butt".to_string(),
            animation: true,
            animation_options: ProgressAnimation::default(),
            clean_before_inject: true,
        }
    }
}

impl ProgressOptions {
    pub fn new(input: f32) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = width;
        self
    }

    pub fn with_stroke_color(mut self, color: &str) -> Self {
        self.stroke_color = color.to_string();
        self
    }

    pub fn with_background_color(mut self, color: &str) -> Self {
        self.background_color = Some(color.to_string());
        self
    }

    pub fn with_mask(mut self, use_mask: bool) -> Self {
        self.use_mask = use_mask;
        self
    }

    pub fn with_animation(mut self, animation: bool) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_animation_options(mut self, options: ProgressAnimation) -> Self {
        self.animation_options = options;
        self
    }

    fn uses_grade(&self) -> bool {
        self.stroke_color == GRADE || self.stroke_background_color == GRADE
    }

    fn validate(&self) -> Result<()> {
        if !self.input.is_finite() {
            return Err(DomError::InvalidOption {
                name: "input",
                reason: format!("{} is not a number", self.input),
            });
        }
        if !(self.stroke_width > 0.0 && self.stroke_width < 100.0) {
            return Err(DomError::InvalidOption {
                name: "strokeWidth",
                reason: format!("{} is outside 0..100", self.stroke_width),
            });
        }
        if !(self.mask_dasharray.is_finite() && self.mask_dasharray > 0.0) {
            return Err(DomError::InvalidOption {
                name: "maskDasharray",
                reason: format!("{} is not a positive length", self.mask_dasharray),
            });
        }
        for (name, cap) in [
            ("strokeLinecap", &self.stroke_linecap),
            ("maskLinecap", &self.mask_linecap),
        ] {
            if !LINECAPS.contains(&cap.as_str()) {
                return Err(DomError::InvalidOption {
                    name,
                    reason: format!("unknown line cap `{}`", cap),
                });
            }
        }

        color_to_array(&self.text_color)?;
        if let Some(background) = &self.background_color {
            color_to_array(background)?;
        }
        for stroke in [&self.stroke_color, &self.stroke_background_color] {
            if stroke != GRADE {
                color_to_array(stroke)?;
            }
        }
        if self.uses_grade() {
            color_to_array(&self.grade_color1)?;
            color_to_array(&self.grade_color2)?;
        }
        Ok(())
    }
}

/// Circle geometry in the 100×100 view box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    pub radius: f32,
    pub circumference: f32,
}

impl RingGeometry {
    pub fn new(stroke_width: f32) -> Self {
        let radius = 50.0 - stroke_width / 2.0;
        Self {
            radius,
            circumference: 2.0 * PI * radius,
        }
    }

    /// Dash offset that leaves `percent` of the ring visible
    pub fn dash_offset(&self, percent: f32) -> f32 {
        self.circumference * (1.0 - percent.clamp(0.0, 100.0) / 100.0)
    }
}

/// Nodes rewritten on every frame
#[derive(Clone, Copy)]
struct ProgressParts {
    fill: NodeId,
    label: NodeId,
}

fn label_text(template: &str, value: f32) -> String {
    template.replace("{input}", &format_number(value.clamp(0.0, 100.0).round()))
}

fn set_attributes(doc: &mut Document, node: NodeId, attributes: &[(&str, String)]) {
    if let Some(element) = doc.element_mut(node) {
        for (name, value) in attributes {
            element.set_attribute(name, value);
        }
    }
}

fn build(
    doc: &mut Document,
    container: NodeId,
    options: &ProgressOptions,
    start: f32,
) -> Result<ProgressParts> {
    if options.clean_before_inject {
        doc.clear_children(container);
    }

    let uid = doc.next_uid();
    let ring = RingGeometry::new(options.stroke_width);
    let radius = format_number(ring.radius);
    let stroke_width = format_number(options.stroke_width);
    let grade_id = format!("sel-progress-grade-{}", uid);
    let mask_id = format!("sel-progress-mask-{}", uid);
    let paint = |color: &str| {
        if color == GRADE {
            format!("url(#{})", grade_id)
        } else {
            color.to_string()
        }
    };

    let svg = doc.append_element(container, "svg")?;
    set_attributes(
        doc,
        svg,
        &[
            ("class", "sel-progress".to_string()),
            ("viewBox", "0 0 100 100".to_string()),
            ("width", "100%".to_string()),
            ("height", "100%".to_string()),
        ],
    );

    if options.uses_grade() || options.use_mask {
        let defs = doc.append_element(svg, "defs")?;
        if options.uses_grade() {
            let gradient = doc.append_element(defs, "linearGradient")?;
            set_attributes(
                doc,
                gradient,
                &[
                    ("id", grade_id.clone()),
                    ("x1", "0".to_string()),
                    ("y1", "0".to_string()),
                    ("x2", "1".to_string()),
                    ("y2", "1".to_string()),
                ],
            );
            for (offset, color) in [("0%", &options.grade_color1), ("100%", &options.grade_color2)] {
                let stop = doc.append_element(gradient, "stop")?;
                set_attributes(
                    doc,
                    stop,
                    &[("offset", offset.to_string()), ("stop-color", color.clone())],
                );
            }
        }
        if options.use_mask {
            let mask = doc.append_element(defs, "mask")?;
            set_attributes(doc, mask, &[("id", mask_id.clone())]);
            let dash = format_number(options.mask_dasharray);
            let circle = doc.append_element(mask, "circle")?;
            set_attributes(
                doc,
                circle,
                &[
                    ("cx", "50".to_string()),
                    ("cy", "50".to_string()),
                    ("r", radius.clone()),
                    ("fill", "none".to_string()),
                    ("stroke", "white".to_string()),
                    ("stroke-width", stroke_width.clone()),
                    ("stroke-dasharray", format!("{} {}", dash, dash)),
                    ("stroke-linecap", options.mask_linecap.clone()),
                ],
            );
        }
    }

    if let Some(background) = &options.background_color {
        let circle = doc.append_element(svg, "circle")?;
        set_attributes(
            doc,
            circle,
            &[
                ("class", "sel-progress-background".to_string()),
                ("cx", "50".to_string()),
                ("cy", "50".to_string()),
                ("r", "50".to_string()),
                ("fill", background.clone()),
            ],
        );
    }

    let mask = options.use_mask.then(|| format!("url(#{})", mask_id));
    for (class, stroke) in [
        ("sel-progress-track", &options.stroke_background_color),
        ("sel-progress-fill", &options.stroke_color),
    ] {
        let circle = doc.append_element(svg, "circle")?;
        let mut attributes = vec![
            ("class", class.to_string()),
            ("cx", "50".to_string()),
            ("cy", "50".to_string()),
            ("r", radius.clone()),
            ("fill", "none".to_string()),
            ("stroke", paint(stroke)),
            ("stroke-width", stroke_width.clone()),
        ];
        if let Some(mask) = &mask {
            attributes.push(("mask", mask.clone()));
        }
        if class == "sel-progress-fill" {
            attributes.extend([
                ("stroke-linecap", options.stroke_linecap.clone()),
                ("stroke-dasharray", format_number(ring.circumference)),
                ("stroke-dashoffset", format_number(ring.dash_offset(start))),
                ("transform", "rotate(-90 50 50)".to_string()),
            ]);
        }
        set_attributes(doc, circle, &attributes);
    }
    let fill = doc
        .children(svg)
        .last()
        .copied()
        .ok_or(DomError::StaleNode)?;

    let label = doc.append_element(svg, "text")?;
    let mut attributes = vec![
        ("class", "sel-progress-text".to_string()),
        ("x", "50".to_string()),
        ("y", "50".to_string()),
        ("text-anchor", "middle".to_string()),
        ("dominant-baseline", "central".to_string()),
        ("fill", options.text_color.clone()),
    ];
    if !options.text_style.is_empty() {
        let style = options
            .text_style
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        attributes.push(("style", style));
    }
    set_attributes(doc, label, &attributes);
    doc.set_text_content(label, &label_text(&options.text, start));

    Ok(ProgressParts { fill, label })
}

impl Selection {
    /// Inject a circular progress indicator into every selected container.
    ///
    /// With `animation` on, the ring fills from 0 to `input`; the label follows
    /// the value when its template contains `{input}`.
    pub fn progress(&self, options: &ProgressOptions) -> Result<RunGroup> {
        options.validate()?;
        let input = options.input.clamp(0.0, 100.0);

        let request = if options.animation {
            Some(InterpolationRequest::resolve(
                &options.animation_options.frame_options(input),
                self.page().scheduler().registry(),
            )?)
        } else {
            None
        };
        let start = if request.is_some() { 0.0 } else { input };

        let built = {
            let mut doc = self.page().document();
            self.live(&doc, "progress")
                .into_iter()
                .map(|container| build(&mut doc, container, options, start))
                .collect::<Result<Vec<_>>>()?
        };

        let mut group = RunGroup::new();
        let Some(request) = request else {
            return Ok(group);
        };
        let ring = RingGeometry::new(options.stroke_width);
        for parts in built {
            let template = options.text.clone();
            let follows_value = template.contains("{input}");
            group.push(self.page().schedule_on_node(
                parts.fill,
                request.clone(),
                move |doc, tick| {
                    let value = tick.value();
                    if let Some(fill) = doc.element_mut(parts.fill) {
                        fill.set_attribute("stroke-dashoffset", &format_number(ring.dash_offset(value)));
                    }
                    if follows_value {
                        doc.set_text_content(parts.label, &label_text(&template, value));
                    }
                    None
                },
                |_, _| {},
            ));
        }
        tracing::debug!("progress: {} indicator(s) animating to {}%", group.len(), input);
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use pretty_assertions::assert_eq;
    use sel_animation::{ManualClock, RunState};

    fn page_with_container() -> (Page, ManualClock) {
        let (page, clock) = Page::headless();
        {
            let mut doc = page.document();
            let body = doc.body();
            let div = doc.append_element(body, "div").unwrap();
            doc.element_mut(div).unwrap().set_attribute("id", "meter");
            doc.set_text_content(div, "loading");
        }
        (page, clock)
    }

    fn fill_offset(page: &Page) -> f32 {
        page.select(".sel-progress-fill")
            .unwrap()
            .attr("stroke-dashoffset")
            .and_then(|v| v.parse().ok())
            .unwrap()
    }

    #[test]
    fn test_geometry() {
        let ring = RingGeometry::new(10.0);
        assert_eq!(ring.radius, 45.0);
        assert!((ring.circumference - 282.743).abs() < 1e-3);
        assert_eq!(ring.dash_offset(100.0), 0.0);
        assert_eq!(ring.dash_offset(0.0), ring.circumference);
        assert_eq!(ring.dash_offset(150.0), 0.0);
    }

    #[test]
    fn test_static_progress_markup() {
        let (page, _) = page_with_container();
        let meter = page.select("#meter").unwrap();
        let group = meter
            .progress(&ProgressOptions::new(25.0).with_animation(false))
            .unwrap();
        assert!(group.is_empty());

        assert_eq!(page.select("#meter > svg[viewBox='0 0 100 100']").unwrap().len(), 1);
        assert_eq!(page.select("linearGradient stop").unwrap().len(), 2);
        assert!(page.select("mask").unwrap().is_empty());
        assert_eq!(meter.text().as_deref(), Some("25%"));

        let ring = RingGeometry::new(10.0);
        assert!((fill_offset(&page) - ring.dash_offset(25.0)).abs() < 1e-2);

        let fill = page.select(".sel-progress-fill").unwrap();
        assert!(fill.attr("stroke").unwrap().starts_with("url(#sel-progress-grade-"));
        assert_eq!(
            page.select(".sel-progress-track").unwrap().attr("stroke").as_deref(),
            Some("lightgrey")
        );
    }

    #[test]
    fn test_input_is_clamped_and_container_cleaned() {
        let (page, _) = page_with_container();
        let meter = page.select("#meter").unwrap();
        meter
            .progress(
                &ProgressOptions::new(140.0)
                    .with_animation(false)
                    .with_stroke_color("#00ff00")
                    .with_text("done"),
            )
            .unwrap();
        assert_eq!(meter.text().as_deref(), Some("done"));
        assert_eq!(fill_offset(&page), 0.0);
        assert!(page.select("linearGradient").unwrap().is_empty());

        meter.progress(&ProgressOptions::new(10.0).with_animation(false)).unwrap();
        assert_eq!(page.select("svg").unwrap().len(), 1);
    }

    #[test]
    fn test_mask_and_background() {
        let (page, _) = page_with_container();
        page.select("#meter")
            .unwrap()
            .progress(
                &ProgressOptions::new(50.0)
                    .with_animation(false)
                    .with_mask(true)
                    .with_background_color("white"),
            )
            .unwrap();
        let mask = page.select("mask circle").unwrap();
        assert_eq!(mask.attr("stroke-dasharray").as_deref(), Some("2 2"));
        let track = page.select(".sel-progress-track").unwrap();
        assert!(track.attr("mask").unwrap().starts_with("url(#sel-progress-mask-"));
        assert_eq!(page.select(".sel-progress-background").unwrap().len(), 1);
    }

    #[test]
    fn test_animated_fill_follows_value() {
        let (page, clock) = page_with_container();
        let meter = page.select("#meter").unwrap();
        let group = meter
            .progress(&ProgressOptions::new(80.0).with_animation_options(ProgressAnimation {
                easing: "linear".into(),
                duration: 1000.0,
                delay: 0.0,
                ..ProgressAnimation::default()
            }))
            .unwrap();
        assert_eq!(meter.text().as_deref(), Some("0%"));

        page.tick();
        clock.advance(500.0);
        page.tick();
        assert_eq!(meter.text().as_deref(), Some("40%"));

        page.run_frames(&clock, 16.0, 200);
        assert!(group.is_finished());
        assert_eq!(meter.text().as_deref(), Some("80%"));
        let ring = RingGeometry::new(10.0);
        assert!((fill_offset(&page) - ring.dash_offset(80.0)).abs() < 1e-2);
    }

    #[test]
    fn test_yoyo_fill_returns_to_empty() {
        let (page, clock) = page_with_container();
        let meter = page.select("#meter").unwrap();
        let options = ProgressOptions::from_json(
            r#"{"input": 60, "animationOptions": {"easing": "linear", "duration": 100,
                "delay": 0, "yoyo": true, "yoyoDuration": 50, "replay": 1}}"#,
        )
        .unwrap();
        assert!(options.animation_options.yoyo);
        assert_eq!(options.animation_options.yoyo_duration, Some(50.0));
        assert_eq!(options.animation_options.replay, 1);

        let group = meter.progress(&options).unwrap();
        page.run_frames(&clock, 10.0, 200);

        let handle = &group.handles()[0];
        assert_eq!(handle.state(), RunState::Completed);
        assert_eq!(handle.cycles_completed(), 2);
        assert_eq!(meter.text().as_deref(), Some("0%"));
        assert!((fill_offset(&page) - RingGeometry::new(10.0).circumference).abs() < 1e-2);
    }

    #[test]
    fn test_css_wide_linecaps_pass_through() {
        let (page, _) = page_with_container();
        page.select("#meter")
            .unwrap()
            .progress(&ProgressOptions {
                stroke_linecap: "inherit".to_string(),
                mask_linecap: "none".to_string(),
                use_mask: true,
                animation: false,
                ..ProgressOptions::new(30.0)
            })
            .unwrap();
        assert_eq!(
            page.select(".sel-progress-fill").unwrap().attr("stroke-linecap").as_deref(),
            Some("inherit")
        );
        assert_eq!(
            page.select("mask circle").unwrap().attr("stroke-linecap").as_deref(),
            Some("none")
        );
    }

    #[test]
    fn test_invalid_options_inject_nothing() {
        let (page, _) = page_with_container();
        let meter = page.select("#meter").unwrap();
        for options in [
            ProgressOptions::new(f32::NAN),
            ProgressOptions::new(50.0).with_stroke_width(0.0),
            ProgressOptions::new(50.0).with_stroke_color("not-a-color"),
            ProgressOptions {
                stroke_linecap: "pointy".to_string(),
                ..ProgressOptions::new(50.0)
            },
        ] {
            assert!(meter.progress(&options).is_err());
        }
        assert_eq!(meter.text().as_deref(), Some("loading"));
        assert!(page.select("svg").unwrap().is_empty());
    }

    #[test]
    fn test_options_from_json() {
        let options = ProgressOptions::from_json(
            r#"{"input": 42, "strokeColor": "blue", "useMask": true,
                "animationOptions": {"easingFunction": "easeInQuad", "duration": 500}}"#,
        )
        .unwrap();
        assert_eq!(options.input, 42.0);
        assert!(options.use_mask);
        assert_eq!(options.animation_options.duration, 500.0);
        assert_eq!(options.animation_options.delay, 300.0);
        assert_eq!(options.text, "{input}%");
        assert_eq!(options.grade_color2, "orange");
    }
}
