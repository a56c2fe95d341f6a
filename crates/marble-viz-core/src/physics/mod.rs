//! Marble xylophone physics.

mod burst;
mod field;
mod key;
mod trail;

pub use burst::Burst;
pub use field::{
    strike_velocity, Marble, RigidBodyField, Strike, DAMPING, FLOOR_Y, GRAVITY, MARBLE_MASS,
    MARBLE_RADIUS, RESTITUTION, TRAIL_CAPACITY,
};
pub use key::{xylophone_layout, Key, KEY_DEPTH, KEY_HEIGHT, KEY_HIT_DURATION, KEY_WIDTH};
pub use trail::TrailBuffer;
