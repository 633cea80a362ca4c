//! Sel Core
//!
//! Foundational pieces shared by the animation driver and the document layer:
//!
//! - **Colors**: parsing CSS color strings into tweenable `[r, g, b, a]` arrays
//! - **Events**: event names, event payloads, and listener dispatch
//!
//! # Example
//!
//! ```rust
//! use sel_core::color::{array_to_color, color_to_array};
//!
//! let rgba = color_to_array("rgba(10, 20, 30, 0.5)").unwrap();
//! assert_eq!(array_to_color(&rgba), "rgba(10, 20, 30, 0.5)");
//! ```

pub mod color;
pub mod events;
pub mod number;

pub use color::{array_to_color, color_to_array, ColorArray, ColorError};
pub use events::{Event, EventData, EventDispatcher, EventError, EventType, Listener};
pub use number::format_number;
