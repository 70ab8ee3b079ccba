//! Input: keyboard and pointer events mapped to world actions.
//!
//! # Invariants
//! - World logic consumes [`Action`]s, never raw events.
//! - Movement intents are unit length or zero.

pub mod action;
pub mod keys;
pub mod pointer;

pub use action::{Action, InputEvent, InputMapper, WHEEL_ZOOM_STEP};
pub use keys::{Direction, KeyState};
pub use pointer::{client_to_ndc, to_ndc};

pub fn crate_info() -> &'static str {
    "geoworld-input v0.1.0"
}
