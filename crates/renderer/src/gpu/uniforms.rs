use bytemuck::{Pod, Zeroable};
use simulation::{Controls, FrameTiming};

/// Uniform block shared by every pass, std140-compatible.
///
/// Values are snapshotted at dispatch time from the per-frame controls
/// copy, so a pass observes whatever the control panel held when it
/// executed.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct SimUniforms {
    /// Surface width/height, agent-grid width/height.
    pub resolution: [f32; 4],
    /// Drag x/y in [0,1]² (or the -1 sentinel), active flag, attract flag.
    pub drag: [f32; 4],
    /// Trail tint rgb; w unused.
    pub color: [f32; 4],
    /// step_size, sensor_distance, sensor_angle, rotation_angle.
    pub params: [f32; 4],
    /// disturb_radius, time seconds, delta seconds, frame index.
    pub misc: [f32; 4],
}

unsafe impl Zeroable for SimUniforms {}
unsafe impl Pod for SimUniforms {}

impl SimUniforms {
    pub fn new(surface: (u32, u32), grid: (u32, u32)) -> Self {
        Self {
            resolution: [
                surface.0 as f32,
                surface.1 as f32,
                grid.0 as f32,
                grid.1 as f32,
            ],
            drag: [-1.0, -1.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 0.0],
            params: [0.0; 4],
            misc: [0.0; 4],
        }
    }

    pub fn set_surface(&mut self, width: u32, height: u32) {
        self.resolution[0] = width as f32;
        self.resolution[1] = height as f32;
    }

    pub fn apply(&mut self, controls: &Controls, timing: &FrameTiming) {
        self.drag = [
            controls.drag.x,
            controls.drag.y,
            if controls.drag.is_active() { 1.0 } else { 0.0 },
            if controls.attract { 1.0 } else { 0.0 },
        ];
        self.color = [
            controls.color[0],
            controls.color[1],
            controls.color[2],
            0.0,
        ];
        self.params = [
            controls.step_size,
            controls.sensor_distance,
            controls.sensor_angle,
            controls.rotation_angle,
        ];
        self.misc = [
            controls.disturb_radius,
            timing.seconds,
            timing.delta_seconds,
            timing.frame_index as f32,
        ];
    }
}

#[cfg(test)]
mod tests {
    use simulation::DragPoint;

    use super::*;

    #[test]
    fn block_size_is_a_multiple_of_sixteen() {
        assert_eq!(std::mem::size_of::<SimUniforms>() % 16, 0);
    }

    #[test]
    fn apply_snapshots_controls_and_timing() {
        let mut uniforms = SimUniforms::new((640, 480), (320, 240));
        let controls = Controls {
            drag: DragPoint::at(0.25, 0.75),
            attract: false,
            step_size: 2.0,
            ..Controls::default()
        };
        let timing = FrameTiming {
            seconds: 1.5,
            delta_seconds: 0.016,
            frame_index: 90,
        };
        uniforms.apply(&controls, &timing);

        assert_eq!(uniforms.drag, [0.25, 0.75, 1.0, 0.0]);
        assert_eq!(uniforms.params[0], 2.0);
        assert_eq!(uniforms.misc[1], 1.5);
        assert_eq!(uniforms.misc[3], 90.0);
    }

    #[test]
    fn inactive_drag_keeps_the_sentinel() {
        let mut uniforms = SimUniforms::new((64, 64), (64, 64));
        uniforms.apply(
            &Controls::default(),
            &FrameTiming {
                seconds: 0.0,
                delta_seconds: 0.0,
                frame_index: 0,
            },
        );
        assert_eq!(&uniforms.drag[..3], &[-1.0, -1.0, 0.0]);
    }
}
