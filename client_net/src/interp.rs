//! Position interpolation.
//!
//! The server sends authoritative position samples at a fixed cadence; the
//! client renders at its own rate. Each remote player owns an [`Interpolator`]
//! that walks the rendered position toward the latest sample every tick,
//! using the player's current animation as a velocity estimate where one is
//! known. Large discontinuities (teleports, respawns) snap instead of
//! smoothing.

use std::collections::HashMap;
use std::time::Duration;

use client_shared::math::Vec3;

/// Nominal interval between authoritative samples.
pub const SYNC_INTERVAL_MS: u64 = 100;
/// Fraction of the remaining distance covered per millisecond of frame time.
pub const STEP_PER_MS: f32 = 0.008;
/// Differences beyond this are teleports and never smoothed.
pub const SNAP_DISTANCE: f32 = 200.0;
/// Differences below this snap to the target exactly.
pub const SNAP_EPSILON: f32 = 1.0;

/// Growth of an axis difference that triggers the overshoot correction.
const DIVERGENCE_SLACK: f32 = 0.25;
const OVERSHOOT_FACTOR: f32 = 1.5;
const CATCH_UP_FACTOR: f32 = 1.25;
/// Animation velocities below this are treated as standing still.
const MIN_ANIMATION_VELOCITY: f32 = 0.1;

/// Maps animation ids to the linear velocity (units/second) the animation
/// moves its model at. Ids missing from the table leave the estimate at zero,
/// falling back to fraction-based stepping.
#[derive(Debug, Clone, Default)]
pub struct AnimationCatalog {
    velocities: HashMap<u16, f32>,
}

impl AnimationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the stock locomotion animations.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.insert(10, 150.0); // walk
        catalog.insert(11, 345.0); // run
        catalog.insert(12, 500.0); // sprint
        catalog
    }

    pub fn insert(&mut self, animation: u16, velocity: f32) {
        self.velocities.insert(animation, velocity);
    }

    pub fn velocity(&self, animation: u16) -> Option<f32> {
        self.velocities.get(&animation).copied()
    }
}

/// Per-entity smoothing state machine: Idle until a target arrives, then
/// Interpolating until the position converges or snaps.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    target: Vec3,
    /// Absolute per-axis difference recorded after the previous step.
    last_diff: Vec3,
    /// Time since the last authoritative sample.
    elapsed_ms: u64,
    /// Animation-derived velocity estimate, units/second.
    velocity: f32,
    interpolating: bool,
    fresh_target: bool,
}

impl Interpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_interpolating(&self) -> bool {
        self.interpolating
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Adopts a new authoritative sample and (re)enters the Interpolating
    /// state.
    pub fn update_target(&mut self, target: Vec3) {
        self.target = target;
        self.interpolating = true;
        self.fresh_target = true;
    }

    /// Refreshes the velocity estimate from the entity's new animation.
    pub fn update_animation(&mut self, animation: u16, catalog: &AnimationCatalog) {
        self.velocity = 0.0;
        if let Some(velocity) = catalog.velocity(animation) {
            if velocity > 0.0 {
                self.velocity = velocity;
            }
        }
    }

    /// Forces the Idle state and clears sample memory.
    pub fn reset(&mut self) {
        self.interpolating = false;
        self.last_diff = Vec3::ZERO;
        self.elapsed_ms = 0;
        self.fresh_target = false;
    }

    /// Advances one tick. Returns the new position to apply, or `None` when
    /// Idle. A returned position equal to the target means the entity
    /// snapped and is Idle again.
    pub fn step(&mut self, current: Vec3, frame: Duration) -> Option<Vec3> {
        if !self.interpolating {
            return None;
        }

        let diff = self.target - current;
        let abs_diff = diff.abs();
        let horizontal = diff.horizontal_len();
        let vertical = abs_diff.y;
        let distance = (horizontal * horizontal + vertical * vertical).sqrt();

        if distance > SNAP_DISTANCE || (horizontal < SNAP_EPSILON && vertical < SNAP_EPSILON) {
            self.reset();
            return Some(self.target);
        }

        if self.fresh_target {
            self.last_diff = abs_diff;
            self.fresh_target = false;
            self.elapsed_ms = 0;
        } else {
            self.elapsed_ms += frame.as_millis() as u64;
        }

        let frame_ms = frame.as_millis() as f32;
        let delta_ms = if frame_ms > 0.0 {
            frame_ms
        } else {
            SYNC_INTERVAL_MS as f32
        };
        let frame_secs = frame.as_secs_f32();
        let delta_secs = if frame_secs > 0.0 {
            frame_secs
        } else {
            SYNC_INTERVAL_MS as f32 / 1000.0
        };

        let step_fraction = (delta_ms * STEP_PER_MS).min(1.0);

        let mut horizontal_step = 0.0;
        if (SNAP_EPSILON..=SNAP_DISTANCE).contains(&horizontal) {
            horizontal_step = if self.velocity >= MIN_ANIMATION_VELOCITY {
                self.velocity * delta_secs
            } else {
                horizontal * step_fraction
            };

            let previous_horizontal = self.last_diff.horizontal_len();
            if horizontal > previous_horizontal + DIVERGENCE_SLACK {
                horizontal_step *= OVERSHOOT_FACTOR;
            }
            if self.elapsed_ms > SYNC_INTERVAL_MS {
                horizontal_step *= CATCH_UP_FACTOR;
            }

            horizontal_step = horizontal_step.min(horizontal);
        }

        let mut vertical_step = 0.0;
        if (SNAP_EPSILON..=SNAP_DISTANCE).contains(&vertical) {
            vertical_step = vertical * step_fraction;

            if vertical > self.last_diff.y + DIVERGENCE_SLACK {
                vertical_step *= OVERSHOOT_FACTOR;
            }
            if self.elapsed_ms > SYNC_INTERVAL_MS {
                vertical_step *= CATCH_UP_FACTOR;
            }

            vertical_step = vertical_step.min(vertical);
        }

        if horizontal_step <= 0.0 && vertical_step <= 0.0 {
            self.reset();
            return Some(self.target);
        }

        let mut next = current;

        if horizontal_step > 0.0 {
            // Normalized ground-plane direction; `horizontal` >= 1 here.
            next.x += diff.x / horizontal * horizontal_step;
            next.z += diff.z / horizontal * horizontal_step;
        } else {
            next.x = self.target.x;
            next.z = self.target.z;
        }

        if !(SNAP_EPSILON..=SNAP_DISTANCE).contains(&vertical) {
            next.y = self.target.y;
        } else if vertical_step > 0.0 {
            next.y += if diff.y < 0.0 {
                -vertical_step
            } else {
                vertical_step
            };
        }

        // Never cross past the target on any axis, whatever the corrections
        // did to the step.
        next.x = clamp_toward(next.x, current.x, self.target.x);
        next.y = clamp_toward(next.y, current.y, self.target.y);
        next.z = clamp_toward(next.z, current.z, self.target.z);

        let remaining = self.target - next;
        self.last_diff = remaining.abs();

        if remaining.horizontal_len() < SNAP_EPSILON && self.last_diff.y < SNAP_EPSILON {
            self.reset();
            return Some(self.target);
        }

        Some(next)
    }
}

/// Clamps `value` so it cannot lie beyond `target` relative to the sign of
/// the original `target - current` difference.
fn clamp_toward(value: f32, current: f32, target: f32) -> f32 {
    if target - current >= 0.0 {
        value.min(target)
    } else {
        value.max(target)
    }
}
