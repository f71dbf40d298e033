use std::time::Instant;

use crate::pipeline::FrameError;

/// Time snapshot handed to the frame hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTiming {
    /// Seconds since the clock started.
    pub seconds: f32,
    /// Seconds since the previous frame.
    pub delta_seconds: f32,
    /// Number of frame hooks fired before this one.
    pub frame_index: u64,
}

/// Wall-clock frame timer.
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
        }
    }

    pub fn sample(&mut self) -> FrameTiming {
        let now = Instant::now();
        let timing = FrameTiming {
            seconds: now.duration_since(self.start).as_secs_f32(),
            delta_seconds: now.duration_since(self.last).as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.last = now;
        self.frame_index += 1;
        timing
    }

    /// Restarts the clock, e.g. after a surface rebuild.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last = now;
        self.frame_index = 0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// The hooks a driver fires against its handler.
///
/// `on_init` fires exactly once, with a valid context, before any frame
/// hook. `on_frame` fires once per display refresh. Zero or more refreshes
/// may elapse between handler construction and the first frame hook; a
/// frame hook observing missing initialisation must fail with
/// [`FrameError::NotInitialised`] rather than silently skip.
pub trait FrameHandler {
    type Context;

    fn on_init(&mut self, ctx: &mut Self::Context) -> Result<(), FrameError>;

    fn on_frame(&mut self, ctx: &mut Self::Context, timing: FrameTiming) -> Result<(), FrameError>;

    /// Dimension change; implementations discard and reconstruct their
    /// render targets. Default is a no-op for handlers without resources.
    fn on_resize(
        &mut self,
        _ctx: &mut Self::Context,
        _width: u32,
        _height: u32,
    ) -> Result<(), FrameError> {
        Ok(())
    }
}

/// Errors surfaced by a driver's run loop.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("initialisation hook failed")]
    Init(#[source] FrameError),
    #[error("frame hook failed")]
    Frame(#[source] FrameError),
    #[error("windowing shell error: {0}")]
    Shell(String),
}

/// The external per-frame clock. The pipeline only depends on this
/// contract, never on a concrete windowing implementation.
pub trait FrameDriver {
    type Context;

    fn drive<H>(self, handler: H) -> Result<(), DriverError>
    where
        H: FrameHandler<Context = Self::Context> + 'static;
}

/// Headless driver stepping a fixed number of frames with synthetic
/// timing. Used by tests and benchmarks; no window, no GPU implied.
pub struct ManualDriver {
    frames: u64,
    frame_interval: f32,
}

impl ManualDriver {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            frame_interval: 1.0 / 60.0,
        }
    }

    pub fn with_frame_interval(mut self, seconds: f32) -> Self {
        self.frame_interval = seconds;
        self
    }
}

impl FrameDriver for ManualDriver {
    type Context = ();

    fn drive<H>(self, mut handler: H) -> Result<(), DriverError>
    where
        H: FrameHandler<Context = ()> + 'static,
    {
        let mut ctx = ();
        handler.on_init(&mut ctx).map_err(DriverError::Init)?;
        for frame_index in 0..self.frames {
            let timing = FrameTiming {
                seconds: frame_index as f32 * self.frame_interval,
                delta_seconds: self.frame_interval,
                frame_index,
            };
            handler
                .on_frame(&mut ctx, timing)
                .map_err(DriverError::Frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHandler {
        initialised: bool,
        frames: Vec<FrameTiming>,
    }

    impl FrameHandler for CountingHandler {
        type Context = ();

        fn on_init(&mut self, _ctx: &mut ()) -> Result<(), FrameError> {
            assert!(self.frames.is_empty(), "init must precede every frame");
            self.initialised = true;
            Ok(())
        }

        fn on_frame(&mut self, _ctx: &mut (), timing: FrameTiming) -> Result<(), FrameError> {
            if !self.initialised {
                return Err(FrameError::NotInitialised("handler"));
            }
            self.frames.push(timing);
            Ok(())
        }
    }

    #[test]
    fn manual_driver_fires_init_once_then_frames_in_order() {
        struct Probe(std::rc::Rc<std::cell::RefCell<CountingHandler>>);
        impl FrameHandler for Probe {
            type Context = ();
            fn on_init(&mut self, ctx: &mut ()) -> Result<(), FrameError> {
                self.0.borrow_mut().on_init(ctx)
            }
            fn on_frame(&mut self, ctx: &mut (), timing: FrameTiming) -> Result<(), FrameError> {
                self.0.borrow_mut().on_frame(ctx, timing)
            }
        }

        let shared = std::rc::Rc::new(std::cell::RefCell::new(CountingHandler::default()));
        ManualDriver::new(3).drive(Probe(shared.clone())).unwrap();

        let handler = shared.borrow();
        assert!(handler.initialised);
        assert_eq!(handler.frames.len(), 3);
        let indices: Vec<_> = handler.frames.iter().map(|timing| timing.frame_index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn frame_before_init_is_fatal_not_silent() {
        let mut handler = CountingHandler::default();
        let err = handler
            .on_frame(
                &mut (),
                FrameTiming {
                    seconds: 0.0,
                    delta_seconds: 0.0,
                    frame_index: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, FrameError::NotInitialised(_)));
    }

    #[test]
    fn clock_samples_are_monotonic() {
        let mut clock = FrameClock::new();
        let first = clock.sample();
        let second = clock.sample();
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(second.seconds >= first.seconds);
        clock.reset();
        assert_eq!(clock.sample().frame_index, 0);
    }
}
