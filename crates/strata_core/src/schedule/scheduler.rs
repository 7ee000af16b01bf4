//! Fixed-step frame loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::signal::Signal;
use super::system::{System, SystemLog};
use crate::config::SchedulerConfig;
use crate::error::{ConfigError, ConfigResult};

/// Runs input, physics and render systems in a frame loop.
///
/// Input and render systems run once per frame with the measured frame
/// time. Physics systems run once per fixed time step of accumulated,
/// speed-scaled frame time, so they may run several times in a slow frame
/// and not at all in a fast one.
///
/// # Example
///
/// ```rust,ignore
/// let mut scheduler = Scheduler::new();
/// scheduler.append_physics([System::new("movement", move |dt| step(&world, dt))]);
/// scheduler.run();
/// ```
#[derive(Debug)]
pub struct Scheduler {
    input: Vec<System>,
    physics: Vec<System>,
    render: Vec<System>,
    /// Variable-dt logs: front is the last completed frame.
    log_front: Vec<SystemLog>,
    log_back: Vec<SystemLog>,
    /// Fixed-dt logs: front is the last frame that ran physics.
    fixed_front: Vec<SystemLog>,
    fixed_back: Vec<SystemLog>,
    fixed_time_step: Duration,
    accumulator: Duration,
    game_speed: u32,
    max_loop_count: u32,
    quit: Arc<Signal>,
    pause_render: Arc<Signal>,
}

impl Scheduler {
    /// Default fixed time step.
    pub const DEFAULT_TIME_STEP: Duration = Duration::from_millis(16);

    /// Creates an empty scheduler: 16 ms step, speed 1, no tick dropping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Vec::new(),
            physics: Vec::new(),
            render: Vec::new(),
            log_front: Vec::new(),
            log_back: Vec::new(),
            fixed_front: Vec::new(),
            fixed_back: Vec::new(),
            fixed_time_step: Self::DEFAULT_TIME_STEP,
            accumulator: Duration::ZERO,
            game_speed: 1,
            max_loop_count: 0,
            quit: Arc::new(Signal::default()),
            pause_render: Arc::new(Signal::default()),
        }
    }

    /// Creates an empty scheduler from configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTimeStep`] for a zero time step.
    pub fn from_config(config: &SchedulerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let mut scheduler = Self::new();
        scheduler.fixed_time_step = config.fixed_time_step();
        scheduler.game_speed = config.game_speed;
        scheduler.max_loop_count = config.max_physics_loop_count;
        Ok(scheduler)
    }

    /// Adds systems to the input phase.
    pub fn append_input(&mut self, systems: impl IntoIterator<Item = System>) {
        self.input.extend(systems);
    }

    /// Adds systems to the fixed-step physics phase.
    pub fn append_physics(&mut self, systems: impl IntoIterator<Item = System>) {
        self.physics.extend(systems);
    }

    /// Adds systems to the render phase.
    pub fn append_render(&mut self, systems: impl IntoIterator<Item = System>) {
        self.render.extend(systems);
    }

    /// Sets the frame-time multiplier. `0` freezes physics.
    pub fn set_game_speed(&mut self, speed: u32) {
        self.game_speed = speed;
    }

    /// Sets the physics tick length.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTimeStep`] for a zero step; the old step is
    /// kept.
    pub fn set_fixed_time_step(&mut self, step: Duration) -> ConfigResult<()> {
        if step.is_zero() {
            return Err(ConfigError::InvalidTimeStep);
        }
        self.fixed_time_step = step;
        Ok(())
    }

    /// Caps the backlog of physics ticks: once more than `count` ticks are
    /// pending at the start of the physics phase, they are all dropped.
    /// `0` runs every tick.
    pub fn set_max_physics_loop_count(&mut self, count: u32) {
        self.max_loop_count = count;
    }

    /// Skips (or resumes) the render phase.
    pub fn pause_render(&self, paused: bool) {
        self.pause_render.set(paused);
    }

    /// Asks [`Scheduler::run`] to return after the current frame.
    pub fn quit(&self) {
        self.quit.set(true);
    }

    /// Shared handle to the quit flag, for systems and other threads.
    #[must_use]
    pub fn quit_signal(&self) -> Arc<Signal> {
        Arc::clone(&self.quit)
    }

    /// Shared handle to the pause-render flag.
    #[must_use]
    pub fn pause_render_signal(&self) -> Arc<Signal> {
        Arc::clone(&self.pause_render)
    }

    /// Variable-dt system timings of the last completed frame.
    #[must_use]
    pub fn syslog(&self) -> &[SystemLog] {
        &self.log_front
    }

    /// Fixed-dt system timings of the last frame that ran physics.
    #[must_use]
    pub fn syslog_fixed(&self) -> &[SystemLog] {
        &self.fixed_front
    }

    /// Fraction of a physics tick left in the accumulator, for render
    /// interpolation.
    #[must_use]
    pub fn render_interp(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.fixed_time_step.as_secs_f64()
    }

    /// Time waiting to be consumed by physics ticks.
    #[must_use]
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Advances the clock by `dt` and runs one frame with it.
    pub fn step(&mut self, dt: Duration) {
        self.accumulate(dt);
        self.run_frame(dt);
    }

    /// Runs frames until the quit signal is set.
    ///
    /// Each frame is fed the wall time of the previous one. A schedule with
    /// only physics systems sleeps until the next tick is due instead of
    /// spinning.
    pub fn run(&mut self) {
        tracing::debug!(
            input = self.input.len(),
            physics = self.physics.len(),
            render = self.render.len(),
            step = ?self.fixed_time_step,
            "scheduler started"
        );

        let mut frame_start = Instant::now();
        let mut dt = self.fixed_time_step;
        self.accumulator = Duration::ZERO;

        while !self.quit.get() {
            self.run_frame(dt);

            if self.input.is_empty() && self.render.is_empty() {
                std::thread::sleep(self.fixed_time_step.saturating_sub(self.accumulator));
            }

            let now = Instant::now();
            dt = now - frame_start;
            frame_start = now;
            self.accumulate(dt);
        }

        tracing::debug!("scheduler stopped");
    }

    fn accumulate(&mut self, dt: Duration) {
        self.accumulator = self
            .accumulator
            .saturating_add(dt.saturating_mul(self.game_speed));
    }

    fn run_frame(&mut self, dt: Duration) {
        self.log_back.clear();
        run_phase(&mut self.input, dt, &mut self.log_back);

        if self.max_loop_count > 0 {
            let limit = self.fixed_time_step.saturating_mul(self.max_loop_count);
            if self.accumulator > limit {
                tracing::warn!(
                    backlog = ?self.accumulator,
                    limit = ?limit,
                    "dropping physics backlog"
                );
                self.accumulator = Duration::ZERO;
            }
        }

        if self.accumulator >= self.fixed_time_step {
            self.fixed_back.clear();
            while self.accumulator >= self.fixed_time_step {
                run_phase(&mut self.physics, self.fixed_time_step, &mut self.fixed_back);
                self.accumulator -= self.fixed_time_step;
            }
            std::mem::swap(&mut self.fixed_front, &mut self.fixed_back);
        }

        if !self.pause_render.get() {
            run_phase(&mut self.render, dt, &mut self.log_back);
        }
        std::mem::swap(&mut self.log_front, &mut self.log_back);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn run_phase(systems: &mut [System], dt: Duration, log: &mut Vec<SystemLog>) {
    for system in systems {
        let time = system.run(dt);
        log.push(SystemLog {
            name: system.name().to_string(),
            time,
        });
    }
}
