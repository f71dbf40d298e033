/// Normalized pointer-drag position, or the `[-1, -1]` sentinel meaning
/// "no drag in progress".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragPoint {
    pub x: f32,
    pub y: f32,
}

impl DragPoint {
    pub const NONE: Self = Self { x: -1.0, y: -1.0 };

    /// Builds a drag point from normalized `[0, 1]²` coordinates, clamped
    /// to the unit square.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn is_active(&self) -> bool {
        *self != Self::NONE
    }
}

impl Default for DragPoint {
    fn default() -> Self {
        Self::NONE
    }
}

/// Frame-scoped control parameters.
///
/// The windowing shell owns the live values and mutates them from input
/// events between frames; the pipeline only ever receives an immutable
/// copy, snapshotted at dispatch time, so a pass observes whatever the
/// panel held at the moment of execution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controls {
    /// Distance an agent advances per generation, in texels.
    pub step_size: f32,
    /// How far ahead of an agent its trail sensors sit, in texels.
    pub sensor_distance: f32,
    /// Angular offset of the side sensors, in radians.
    pub sensor_angle: f32,
    /// How far an agent may turn per generation, in radians.
    pub rotation_angle: f32,
    /// Radius of the pointer disturbance, normalized to target size.
    pub disturb_radius: f32,
    /// Trail tint.
    pub color: [f32; 3],
    /// Freezes simulation stepping; rendering keeps running.
    pub paused: bool,
    /// Current pointer drag, or [`DragPoint::NONE`].
    pub drag: DragPoint,
    /// Drag pulls agents inward when set, pushes outward otherwise.
    pub attract: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            sensor_distance: 9.0,
            sensor_angle: 45f32.to_radians(),
            rotation_angle: 20f32.to_radians(),
            disturb_radius: 0.08,
            color: [0.35, 0.85, 0.45],
            paused: false,
            drag: DragPoint::NONE,
            attract: true,
        }
    }
}
