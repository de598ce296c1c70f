use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::scheduler::{
    AutoAdvanceScheduler, CarouselMetrics, CarouselView, Direction, Input, Interaction,
};
use crate::config::CarouselConfig;

/// Commands sent from the view to a running carousel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarouselCommand {
    Interaction(Interaction),
    Step(Direction),
    Resize(CarouselMetrics),
    Stop,
}

/// Runs an [`AutoAdvanceScheduler`] on tokio timers
pub struct CarouselDriver {
    scheduler: AutoAdvanceScheduler,
    command_rx: mpsc::UnboundedReceiver<CarouselCommand>,
    view_tx: watch::Sender<CarouselView>,
}

impl CarouselDriver {
    /// Spawn a driver for a carousel with the given geometry
    pub fn spawn(config: CarouselConfig, metrics: CarouselMetrics) -> CarouselHandle {
        let scheduler = AutoAdvanceScheduler::new(config, metrics);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(scheduler.view());

        let driver = Self {
            scheduler,
            command_rx,
            view_tx,
        };
        let task = tokio::spawn(driver.run());

        CarouselHandle {
            command_tx,
            view_rx,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        if self.scheduler.is_stopped() {
            debug!("Carousel has no items, not starting timers");
            return;
        }

        let tick_period = self.scheduler.config().tick_interval();
        let frame_period = self.scheduler.config().frame_interval();
        info!(
            "Carousel started: tick={}ms, frame={}ms",
            tick_period.as_millis(),
            frame_period.as_millis()
        );

        // First tick one period out rather than immediately
        let start = Instant::now();
        let mut ticks = interval_at(start + tick_period, tick_period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames = interval_at(start + frame_period, frame_period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticking = self.scheduler.wants_ticks();

        loop {
            let wants_ticks = self.scheduler.wants_ticks();
            if wants_ticks && !ticking {
                // The resuming input already advanced; don't replay missed ticks
                ticks.reset();
            }
            ticking = wants_ticks;
            let frames_needed = self.scheduler.frames_needed();
            let deadline = self.scheduler.next_deadline();

            let input = tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.input_for(command),
                    None => {
                        debug!("Carousel handle dropped");
                        break;
                    }
                },

                _ = ticks.tick(), if wants_ticks => Input::Tick(Instant::now()),

                _ = frames.tick(), if frames_needed => Input::Frame(Instant::now()),

                // Wake for idle resume or the end-of-track grace delay
                _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                    Input::Tick(Instant::now())
                }
            };

            let output = self.scheduler.handle(input);
            self.publish();

            if output.release {
                break;
            }
        }

        info!("Carousel stopped, timers released");
    }

    fn input_for(&self, command: CarouselCommand) -> Input {
        let now = Instant::now();
        match command {
            CarouselCommand::Interaction(kind) => Input::Interaction(now, kind),
            CarouselCommand::Step(direction) => Input::Step(now, direction),
            CarouselCommand::Resize(metrics) => Input::Resize(metrics),
            CarouselCommand::Stop => Input::Stop,
        }
    }

    fn publish(&self) {
        let view = self.scheduler.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400)
}

/// Owner side of a running carousel; dropping it stops the driver
pub struct CarouselHandle {
    command_tx: mpsc::UnboundedSender<CarouselCommand>,
    view_rx: watch::Receiver<CarouselView>,
    task: Option<JoinHandle<()>>,
}

impl CarouselHandle {
    fn send(&self, command: CarouselCommand) {
        if self.command_tx.send(command).is_err() {
            warn!(?command, "Carousel command dropped: driver not running");
        }
    }

    pub fn interact(&self, kind: Interaction) {
        self.send(CarouselCommand::Interaction(kind));
    }

    pub fn advance(&self) {
        self.send(CarouselCommand::Step(Direction::Forward));
    }

    pub fn retreat(&self) {
        self.send(CarouselCommand::Step(Direction::Backward));
    }

    pub fn resize(&self, metrics: CarouselMetrics) {
        self.send(CarouselCommand::Resize(metrics));
    }

    /// Ask the driver to stop and release its timers
    pub fn stop(&self) {
        self.send(CarouselCommand::Stop);
    }

    /// Latest published view
    pub fn view(&self) -> CarouselView {
        *self.view_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CarouselView> {
        self.view_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the driver task to exit
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Carousel driver panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for CarouselHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::Phase;

    fn config() -> CarouselConfig {
        CarouselConfig {
            tick_interval_ms: 20,
            step_size: 1.0,
            idle_resume_ms: 3000,
            rewind_grace_ms: 1000,
            rewind_duration_ms: 600,
            end_epsilon: 2.0,
            ..Default::default()
        }
    }

    fn metrics() -> CarouselMetrics {
        CarouselMetrics {
            scroll_width: 1400.0,
            client_width: 400.0,
            item_count: 6,
        }
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_advances_on_ticks() {
        let handle = CarouselDriver::spawn(config(), metrics());
        assert_eq!(handle.view().position, 0.0);

        wait(1010).await;
        let view = handle.view();
        assert!(view.position >= 45.0 && view.position <= 51.0, "{}", view.position);
        assert!(view.can_advance);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_interaction_pauses_then_resumes() {
        let handle = CarouselDriver::spawn(config(), metrics());
        wait(210).await;

        handle.interact(Interaction::PointerEnter);
        wait(10).await;
        let held = handle.view().position;
        assert!(matches!(handle.view().phase, Phase::Suspended { .. }));

        wait(2900).await;
        assert_eq!(handle.view().position, held);

        wait(300).await;
        assert!(handle.view().position > held);
        assert_eq!(handle.view().phase, Phase::Advancing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_moves_one_step_at_a_time() {
        let handle = CarouselDriver::spawn(config(), metrics());
        wait(210).await;

        handle.interact(Interaction::TouchStart);
        wait(10).await;
        let held = handle.view().position;

        // Idle deadline at 3210ms advances once; the next tick is a period later
        wait(2985).await;
        assert_eq!(handle.view().position, held + 1.0);
        wait(20).await;
        assert_eq!(handle.view().position, held + 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_rewinds_after_reaching_end() {
        let mut cfg = config();
        cfg.step_size = 100.0;
        let handle = CarouselDriver::spawn(cfg, metrics());

        // 10 ticks reach max_offset = 1000
        wait(210).await;
        assert!(matches!(handle.view().phase, Phase::Holding { .. }));
        assert!(!handle.view().can_advance);

        // Grace delay ends at 1200ms, rewind runs until 1800ms
        wait(1300).await;
        let mid = handle.view();
        assert!(matches!(mid.phase, Phase::Rewinding(_)));
        assert!(mid.position > 0.0 && mid.position < 1000.0, "{}", mid.position);

        // Back at the start and advancing again
        wait(400).await;
        let view = handle.view();
        assert_eq!(view.phase, Phase::Advancing);
        assert!(view.position < 998.0, "{}", view.position);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_manual_step() {
        let handle = CarouselDriver::spawn(config(), metrics());
        handle.interact(Interaction::Wheel);
        handle.advance();

        wait(400).await;
        // 400px container falls in the narrow tier
        assert_eq!(handle.view().position, 252.0);
        assert!(handle.view().can_retreat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_driver() {
        let mut handle = CarouselDriver::spawn(config(), metrics());
        wait(100).await;

        handle.stop();
        handle.finished().await;
        assert!(!handle.is_running());
        assert_eq!(handle.view().phase, Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_resize_releases_driver() {
        let mut handle = CarouselDriver::spawn(config(), metrics());
        handle.resize(CarouselMetrics {
            item_count: 0,
            ..metrics()
        });
        handle.finished().await;
        assert_eq!(handle.view().phase, Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_driver() {
        let handle = CarouselDriver::spawn(config(), metrics());
        let mut views = handle.subscribe();
        drop(handle);

        // Sender side goes away with the aborted task
        wait(50).await;
        assert!(views.changed().await.is_err());
    }
}
