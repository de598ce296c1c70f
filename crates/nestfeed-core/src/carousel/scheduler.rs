//! Auto-advance state machine for listing carousels
//!
//! The scheduler never reads a clock. Every timer or frame callback is fed
//! in as an [`Input`] carrying the current instant, and [`AutoAdvanceScheduler::handle`]
//! is the only place the position or phase changes.

use tokio::time::Instant;
use tracing::debug;

use super::animation::Animation;
use super::breakpoints::step_unit;
use crate::config::CarouselConfig;

/// Geometry of the carousel's scroll container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CarouselMetrics {
    /// Full scrollable width of the track
    pub scroll_width: f64,
    /// Visible width of the container
    pub client_width: f64,
    /// Number of cards in the track
    pub item_count: usize,
}

impl CarouselMetrics {
    /// Largest reachable scroll offset (zero when nothing overflows)
    pub fn max_offset(&self) -> f64 {
        (self.scroll_width - self.client_width).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Ticks move the position forward
    Advancing,
    /// User took control; advancing resumes at `until` unless interrupted again
    Suspended { until: Instant },
    /// End reached; waiting out the grace delay before rewinding
    Holding { rewind_at: Instant },
    /// Animating back to the start
    Rewinding(Animation),
    /// No content; every timer should be released
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerEnter,
    TouchStart,
    Wheel,
    /// Explicit advance/retreat control
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Auto-advance interval fired (or a scheduled deadline elapsed)
    Tick(Instant),
    /// Animation frame
    Frame(Instant),
    Interaction(Instant, Interaction),
    /// Manual advance/retreat request
    Step(Instant, Direction),
    /// Container or content size changed
    Resize(CarouselMetrics),
    Stop,
}

/// Result of handling one input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Output {
    pub position: f64,
    pub moved: bool,
    /// The owner should drop every interval and frame callback
    pub release: bool,
}

/// Render-facing carousel state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselView {
    pub position: f64,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub phase: Phase,
}

#[derive(Debug, Clone)]
pub struct AutoAdvanceScheduler {
    config: CarouselConfig,
    metrics: CarouselMetrics,
    phase: Phase,
    position: f64,
    /// Manual step in progress; runs independently of the phase
    step: Option<Animation>,
}

impl AutoAdvanceScheduler {
    pub fn new(config: CarouselConfig, metrics: CarouselMetrics) -> Self {
        let phase = if metrics.item_count == 0 {
            Phase::Stopped
        } else {
            Phase::Advancing
        };
        Self {
            config,
            metrics,
            phase,
            position: 0.0,
            step: None,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn metrics(&self) -> CarouselMetrics {
        self.metrics
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn can_advance(&self) -> bool {
        self.position < self.metrics.max_offset() - self.config.end_epsilon
    }

    pub fn can_retreat(&self) -> bool {
        self.position > self.config.end_epsilon
    }

    pub fn view(&self) -> CarouselView {
        CarouselView {
            position: self.position,
            can_advance: self.can_advance(),
            can_retreat: self.can_retreat(),
            phase: self.phase,
        }
    }

    /// Whether the auto-advance interval has anything to do
    pub fn wants_ticks(&self) -> bool {
        self.phase == Phase::Advancing && self.step.is_none() && self.metrics.max_offset() > 0.0
    }

    /// Whether an animation needs frame callbacks
    pub fn frames_needed(&self) -> bool {
        matches!(self.phase, Phase::Rewinding(_)) || self.step.is_some()
    }

    /// Next instant at which the phase changes without further input
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Suspended { until } => Some(until),
            Phase::Holding { rewind_at } => Some(rewind_at),
            _ => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Apply one input; the single transition function of the carousel
    pub fn handle(&mut self, input: Input) -> Output {
        let before = self.position;

        if !self.is_stopped() {
            match input {
                Input::Tick(now) => {
                    self.expire(now);
                    self.advance(now);
                }
                Input::Frame(now) => {
                    self.expire(now);
                    self.animate(now);
                }
                Input::Interaction(now, kind) => self.suspend(now, kind),
                Input::Step(now, direction) => self.manual_step(now, direction),
                Input::Resize(metrics) => self.resize(metrics),
                Input::Stop => self.stop(),
            }
        }

        Output {
            position: self.position,
            moved: (self.position - before).abs() > f64::EPSILON,
            release: self.is_stopped(),
        }
    }

    /// Timed transitions that are due at `now`
    fn expire(&mut self, now: Instant) {
        match self.phase {
            Phase::Suspended { until } if now >= until => {
                debug!("Idle timeout elapsed, resuming auto-advance");
                self.phase = Phase::Advancing;
            }
            Phase::Holding { rewind_at } if now >= rewind_at => {
                debug!(from = self.position, "Rewinding carousel");
                self.phase = Phase::Rewinding(Animation::new(
                    rewind_at,
                    self.position,
                    0.0,
                    self.config.rewind_duration(),
                    self.config.easing,
                ));
                // A long-delayed observer may already be past the end
                self.animate(now);
            }
            _ => {}
        }
    }

    fn advance(&mut self, now: Instant) {
        if !self.wants_ticks() {
            return;
        }
        let max = self.metrics.max_offset();
        let end = max - self.config.end_epsilon;

        if self.position < end {
            self.position = (self.position + self.config.step_size).min(max);
        }
        if self.position >= end {
            debug!(position = self.position, "Reached end of carousel");
            self.phase = Phase::Holding {
                rewind_at: now + self.config.rewind_grace(),
            };
        }
    }

    fn animate(&mut self, now: Instant) {
        if let Phase::Rewinding(rewind) = self.phase {
            self.position = rewind.sample(now);
            if rewind.is_complete(now) {
                self.position = 0.0;
                self.phase = Phase::Advancing;
                debug!("Rewind complete");
            }
        }

        if let Some(step) = self.step {
            self.position = step.sample(now).clamp(0.0, self.metrics.max_offset());
            if step.is_complete(now) {
                self.step = None;
            }
        }
    }

    fn suspend(&mut self, now: Instant, kind: Interaction) {
        let until = now + self.config.idle_resume();
        if matches!(self.phase, Phase::Rewinding(_) | Phase::Holding { .. }) {
            debug!(?kind, "Interaction cancelled pending rewind");
        }
        self.phase = Phase::Suspended { until };
    }

    fn manual_step(&mut self, now: Instant, direction: Direction) {
        self.suspend(now, Interaction::Control);

        let unit = step_unit(&self.config.breakpoints, self.metrics.client_width);
        // Chain onto a running step so rapid presses accumulate
        let origin = self.step.map(|s| s.to).unwrap_or(self.position);
        let target = match direction {
            Direction::Forward => origin + unit,
            Direction::Backward => origin - unit,
        }
        .clamp(0.0, self.metrics.max_offset());

        if (target - self.position).abs() <= f64::EPSILON {
            self.step = None;
            return;
        }

        let step = Animation::new(
            now,
            self.position,
            target,
            self.config.step_animation(),
            self.config.easing,
        );
        if step.is_complete(now) {
            self.position = target;
            self.step = None;
        } else {
            self.step = Some(step);
        }
    }

    fn resize(&mut self, metrics: CarouselMetrics) {
        self.metrics = metrics;
        if metrics.item_count == 0 {
            self.stop();
            return;
        }
        let max = metrics.max_offset();
        self.position = self.position.clamp(0.0, max);
        if let Some(step) = self.step.as_mut() {
            step.to = step.to.clamp(0.0, max);
        }
        // A wider track means the end is no longer reached
        if matches!(self.phase, Phase::Holding { .. }) && self.can_advance() {
            debug!(position = self.position, max, "Track grew, cancelling rewind");
            self.phase = Phase::Advancing;
        }
    }

    fn stop(&mut self) {
        debug!("Carousel stopped");
        self.phase = Phase::Stopped;
        self.step = None;
    }
}
