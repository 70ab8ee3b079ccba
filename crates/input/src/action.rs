use glam::Vec2;
use geoworld_common::EntityKey;

use crate::keys::KeyState;
use crate::pointer::to_ndc;

/// Zoom factor applied per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;

/// Raw input as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    /// Pointer press in element pixels.
    PointerDown { x: f32, y: f32 },
    /// Positive is away from the user.
    Wheel(f32),
    Resize { width: u32, height: u32 },
    /// Element lost focus; held keys are dropped.
    Blur,
}

/// A high-level action consumed by the runtime. Raw events never reach world logic.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// New movement direction for the selected player in world `(x, z)`; zero stops.
    Move(Vec2),
    /// Pointer pick at normalized device coordinates.
    Click(Vec2),
    Select(EntityKey),
    Deselect,
    /// Multiply the current zoom.
    ZoomBy(f32),
    Resize { width: u32, height: u32 },
    Noop,
}

/// Turns [`InputEvent`]s into [`Action`]s, tracking held keys and viewport size.
#[derive(Debug, Clone)]
pub struct InputMapper {
    keys: KeyState,
    viewport: Vec2,
}

impl InputMapper {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            keys: KeyState::new(),
            viewport: Vec2::new(width as f32, height as f32),
        }
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    pub fn handle(&mut self, event: InputEvent) -> Action {
        match event {
            InputEvent::KeyDown(key) => {
                let before = self.keys.intent();
                if self.keys.press(&key) && self.keys.intent() != before {
                    Action::Move(self.keys.intent())
                } else {
                    Action::Noop
                }
            }
            InputEvent::KeyUp(key) => {
                let before = self.keys.intent();
                if self.keys.release(&key) && self.keys.intent() != before {
                    Action::Move(self.keys.intent())
                } else {
                    Action::Noop
                }
            }
            InputEvent::PointerDown { x, y } => match to_ndc(Vec2::new(x, y), self.viewport) {
                Some(ndc) => Action::Click(ndc),
                None => Action::Noop,
            },
            InputEvent::Wheel(delta) if delta > 0.0 => Action::ZoomBy(WHEEL_ZOOM_STEP),
            InputEvent::Wheel(delta) if delta < 0.0 => Action::ZoomBy(1.0 / WHEEL_ZOOM_STEP),
            InputEvent::Wheel(_) => Action::Noop,
            InputEvent::Resize { width, height } => {
                if width > 0 && height > 0 {
                    self.viewport = Vec2::new(width as f32, height as f32);
                }
                Action::Resize { width, height }
            }
            InputEvent::Blur => {
                let was_moving = self.keys.is_moving();
                self.keys.clear();
                if was_moving {
                    Action::Move(Vec2::ZERO)
                } else {
                    Action::Noop
                }
            }
        }
    }
}
