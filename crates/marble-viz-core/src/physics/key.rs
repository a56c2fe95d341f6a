use glam::Vec3;

use crate::scene::Color;

pub const KEY_WIDTH: f32 = 1.5;
pub const KEY_HEIGHT: f32 = 0.3;
pub const KEY_DEPTH: f32 = 1.0;

/// Seconds a key stays lit after a strike
pub const KEY_HIT_DURATION: f32 = 0.5;

/// C major scale, 4th octave
const SCALE: [(&str, f32); 7] = [
    ("C4", 261.63),
    ("D4", 293.66),
    ("E4", 329.63),
    ("F4", 349.23),
    ("G4", 392.00),
    ("A4", 440.00),
    ("B4", 493.88),
];

const KEY_SPACING: f32 = 1.8;
/// Outer keys sit lower so deflected marbles land on them
const KEY_DROP: f32 = 0.6;

/// A resonant bar marbles bounce off
#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    pub position: Vec3,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub note: &'static str,
    pub frequency: f32,
    pub color: Color,
    is_hit: bool,
    hit_time: f32,
}

impl Key {
    pub fn new(note: &'static str, frequency: f32, position: Vec3, color: Color) -> Self {
        Self {
            position,
            width: KEY_WIDTH,
            height: KEY_HEIGHT,
            depth: KEY_DEPTH,
            note,
            frequency,
            color,
            is_hit: false,
            hit_time: 0.0,
        }
    }

    pub fn top(&self) -> f32 {
        self.position.y + self.height / 2.0
    }

    /// Overlap of a sphere's x/y extent with the key footprint (depth ignored)
    pub fn overlaps(&self, center: Vec3, radius: f32) -> bool {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        center.x + radius >= self.position.x - half_w
            && center.x - radius <= self.position.x + half_w
            && center.y + radius >= self.position.y - half_h
            && center.y - radius <= self.position.y + half_h
    }

    pub fn is_hit(&self) -> bool {
        self.is_hit
    }

    pub fn hit_time(&self) -> f32 {
        self.hit_time
    }

    pub(crate) fn strike(&mut self, now: f32) {
        self.is_hit = true;
        self.hit_time = now;
    }

    /// Clear the hit flag once it is older than [`KEY_HIT_DURATION`]
    pub(crate) fn expire(&mut self, now: f32) {
        if self.is_hit && now - self.hit_time >= KEY_HIT_DURATION {
            self.is_hit = false;
        }
    }

    pub fn display_color(&self) -> Color {
        if self.is_hit {
            self.color.lerp(Color::WHITE, 0.6)
        } else {
            self.color
        }
    }
}

/// The seven-key xylophone, C4 to B4, left to right
pub fn xylophone_layout() -> Vec<Key> {
    let center = (SCALE.len() - 1) as f32 / 2.0;
    SCALE
        .iter()
        .enumerate()
        .map(|(i, &(note, frequency))| {
            let offset = i as f32 - center;
            let position = Vec3::new(offset * KEY_SPACING, -offset.abs() * KEY_DROP, 0.0);
            let color = Color::from_hsv(i as f32 * 360.0 / SCALE.len() as f32, 0.7, 0.9);
            Key::new(note, frequency, position, color)
        })
        .collect()
}
