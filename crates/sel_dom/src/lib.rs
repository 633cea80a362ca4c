//! Sel Document Layer
//!
//! A small document model with a chainable selection API on top, plus the
//! animated helpers built on the interpolation driver:
//!
//! - [`Selection::animate`] tweens inline CSS properties
//! - [`Selection::scroll_to`] jumps or glides scroll containers
//! - [`Selection::progress`] injects a circular SVG progress indicator
//! - [`Selection::keyframes`] plays offset-based keyframe lists
//!
//! [`Selection::pan`] adds drag-to-scroll to containers.
//!
//! # Example
//!
//! ```rust
//! use sel_dom::{AnimateOptions, CssProperties, Page};
//!
//! let (page, clock) = Page::headless();
//! {
//!     let mut doc = page.document();
//!     let body = doc.body();
//!     let card = doc.append_element(body, "div").unwrap();
//!     doc.element_mut(card).unwrap().set_attribute("class", "card");
//! }
//!
//! let cards = page.select(".card").unwrap();
//! cards.animate(
//!     &CssProperties::from([("opacity", "0")]),
//!     &CssProperties::from([("opacity", "1")]),
//!     &AnimateOptions::new().with_duration(200.0),
//! ).unwrap();
//!
//! page.run_frames(&clock, 16.0, 100);
//! assert_eq!(cards.get_style("opacity").as_deref(), Some("1"));
//! ```

pub mod animate;
pub mod document;
pub mod error;
pub mod keyframes;
pub mod page;
pub mod pan;
pub mod progress;
pub mod scroll;
pub mod selection;
pub mod selector;
pub mod style;

pub use animate::AnimateOptions;
pub use document::{Document, ElementData, LayoutMetrics, Node, NodeId, NodeKind};
pub use error::{DomError, Result};
pub use keyframes::{FillMode, Keyframe, KeyframeOptions, PlaybackDirection};
pub use page::{Page, SharedDocument, Target};
pub use progress::{ProgressAnimation, ProgressOptions, RingGeometry};
pub use scroll::{ScrollBehavior, ScrollTarget, ScrollToOptions};
pub use selection::Selection;
pub use selector::Selector;
pub use style::{CssProperties, CssValue};

pub use sel_animation::{AnimationScheduler, RunGroup, RunHandle, RunState};
pub use sel_core::{array_to_color, color_to_array, Listener};
