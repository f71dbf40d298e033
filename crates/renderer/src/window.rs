use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use simulation::{Controls, DragPoint, DriverError, FrameClock, FrameDriver, FrameHandler};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

/// Everything the frame handler is allowed to touch: the live window,
/// its current size, and the control values the panel mutates between
/// frames.
pub struct ShellContext {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,
    pub controls: Controls,
}

/// Maps raw input events onto control mutations.
///
/// A held left button continuously re-derives the drag point from the
/// latest cursor position, so dragging sweeps the disturbance across the
/// field rather than pinning it where the press happened.
#[derive(Default)]
struct ControlPanel {
    cursor: Option<PhysicalPosition<f64>>,
    dragging: bool,
}

const ANGLE_STEP: f32 = 5.0 * std::f32::consts::PI / 180.0;

const COLOR_PRESETS: [[f32; 3]; 4] = [
    [0.35, 0.85, 0.45],
    [0.90, 0.75, 0.25],
    [0.30, 0.55, 0.95],
    [0.90, 0.35, 0.55],
];

impl ControlPanel {
    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
    }

    fn button(&mut self, state: ElementState) {
        self.dragging = state == ElementState::Pressed;
    }

    /// Writes the current drag point (or the sentinel) into the controls.
    /// Window y grows downward, texture y grows upward, hence the flip.
    fn sync_drag(&self, controls: &mut Controls, size: PhysicalSize<u32>) {
        controls.drag = match (self.dragging, self.cursor) {
            (true, Some(position)) => DragPoint::at(
                position.x as f32 / size.width.max(1) as f32,
                1.0 - position.y as f32 / size.height.max(1) as f32,
            ),
            _ => DragPoint::NONE,
        };
    }

    /// Keyboard bindings. Returns true when the key asked to quit.
    fn key(&mut self, logical_key: &Key, state: ElementState, controls: &mut Controls) -> bool {
        if state != ElementState::Pressed {
            return false;
        }
        match logical_key {
            Key::Named(NamedKey::Escape) => return true,
            Key::Named(NamedKey::Space) => {
                controls.paused = !controls.paused;
                tracing::info!(paused = controls.paused, "pause toggled");
            }
            Key::Character(value) => match value.as_str() {
                "q" => controls.sensor_distance = (controls.sensor_distance - 1.0).max(1.0),
                "w" => controls.sensor_distance += 1.0,
                "a" => controls.sensor_angle = (controls.sensor_angle - ANGLE_STEP).max(0.0),
                "s" => {
                    controls.sensor_angle =
                        (controls.sensor_angle + ANGLE_STEP).min(std::f32::consts::FRAC_PI_2)
                }
                "z" => controls.rotation_angle = (controls.rotation_angle - ANGLE_STEP).max(0.0),
                "x" => {
                    controls.rotation_angle =
                        (controls.rotation_angle + ANGLE_STEP).min(std::f32::consts::FRAC_PI_2)
                }
                "e" => controls.step_size = (controls.step_size - 0.25).max(0.25),
                "r" => controls.step_size = (controls.step_size + 0.25).min(8.0),
                "d" => controls.disturb_radius = (controls.disturb_radius - 0.01).max(0.01),
                "f" => controls.disturb_radius = (controls.disturb_radius + 0.01).min(0.5),
                "t" => controls.attract = !controls.attract,
                "1" => controls.color = COLOR_PRESETS[0],
                "2" => controls.color = COLOR_PRESETS[1],
                "3" => controls.color = COLOR_PRESETS[2],
                "4" => controls.color = COLOR_PRESETS[3],
                _ => {}
            },
            _ => {}
        }
        false
    }
}

/// Windowed frame driver: owns the winit event loop and fires the
/// handler hooks from it. Redraws are requested continuously; pacing
/// comes from vsync, or from a wall-clock cap when `target_fps` is set.
pub struct WindowDriver {
    title: String,
    size: (u32, u32),
    controls: Controls,
    target_fps: Option<f32>,
}

impl WindowDriver {
    pub fn new(title: impl Into<String>, size: (u32, u32)) -> Self {
        Self {
            title: title.into(),
            size,
            controls: Controls::default(),
            target_fps: None,
        }
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_target_fps(mut self, fps: Option<f32>) -> Self {
        self.target_fps = fps.filter(|fps| *fps > 0.0);
        self
    }
}

impl FrameDriver for WindowDriver {
    type Context = ShellContext;

    fn drive<H>(self, mut handler: H) -> Result<(), DriverError>
    where
        H: FrameHandler<Context = ShellContext> + 'static,
    {
        let event_loop = EventLoopBuilder::new()
            .build()
            .map_err(|err| DriverError::Shell(format!("failed to create event loop: {err}")))?;
        let window = WindowBuilder::new()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.size.0, self.size.1))
            .build(&event_loop)
            .map_err(|err| DriverError::Shell(format!("failed to create window: {err}")))?;
        let window = Arc::new(window);

        let mut ctx = ShellContext {
            window: window.clone(),
            size: window.inner_size(),
            controls: self.controls,
        };
        handler.on_init(&mut ctx).map_err(DriverError::Init)?;

        let frame_interval = self
            .target_fps
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        let mut clock = FrameClock::new();
        let mut panel = ControlPanel::default();
        let mut next_deadline = Instant::now();

        let failure: Rc<RefCell<Option<DriverError>>> = Rc::new(RefCell::new(None));
        let failure_slot = failure.clone();
        let run_result = event_loop.run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    ctx.size = new_size;
                    if let Err(err) = handler.on_resize(&mut ctx, new_size.width, new_size.height)
                    {
                        *failure_slot.borrow_mut() = Some(DriverError::Frame(err));
                        elwt.exit();
                        return;
                    }
                    clock.reset();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if panel.key(&event.logical_key, event.state, &mut ctx.controls) {
                        elwt.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => panel.cursor_moved(position),
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => panel.button(state),
                WindowEvent::RedrawRequested => {
                    panel.sync_drag(&mut ctx.controls, ctx.size);
                    let timing = clock.sample();
                    if let Err(err) = handler.on_frame(&mut ctx, timing) {
                        *failure_slot.borrow_mut() = Some(DriverError::Frame(err));
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => match frame_interval {
                Some(interval) => {
                    let now = Instant::now();
                    if now >= next_deadline {
                        next_deadline = now + interval;
                        ctx.window.request_redraw();
                    }
                    elwt.set_control_flow(ControlFlow::WaitUntil(next_deadline));
                }
                None => {
                    ctx.window.request_redraw();
                    elwt.set_control_flow(ControlFlow::Poll);
                }
            },
            _ => {}
        });

        if let Some(err) = failure.borrow_mut().take() {
            return Err(err);
        }
        run_result.map_err(|err| DriverError::Shell(format!("event loop error: {err}")))
    }
}
