use std::collections::BTreeSet;

use glam::Vec2;

/// A movement direction on the ground plane. Up is north (-z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Map a key name (`w`, `ArrowUp`, ...) to a direction. Case-insensitive.
    pub fn from_key(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" | "arrowup" | "up" => Some(Self::Up),
            "s" | "arrowdown" | "down" => Some(Self::Down),
            "a" | "arrowleft" | "left" => Some(Self::Left),
            "d" | "arrowright" | "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Unit step in world `(x, z)`.
    pub fn vector(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Directional keys currently held.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    held: BTreeSet<Direction>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for keys that are not movement keys.
    pub fn press(&mut self, key: &str) -> bool {
        Direction::from_key(key).map(|d| self.held.insert(d)).is_some()
    }

    pub fn release(&mut self, key: &str) -> bool {
        Direction::from_key(key).map(|d| self.held.remove(&d)).is_some()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_moving(&self) -> bool {
        self.intent() != Vec2::ZERO
    }

    /// Normalized movement direction in world `(x, z)`; zero when idle or when
    /// opposite keys cancel.
    pub fn intent(&self) -> Vec2 {
        self.held
            .iter()
            .map(|d| d.vector())
            .sum::<Vec2>()
            .normalize_or_zero()
    }
}
