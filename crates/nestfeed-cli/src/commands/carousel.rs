use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use tokio::time::Instant;

use nestfeed_core::{
    carousel::{AutoAdvanceScheduler, CarouselMetrics, Direction, Input, Interaction, Phase},
    AppConfig,
};

#[derive(Args, Debug)]
pub struct CarouselArgs {
    /// Scrollable width of the track in pixels
    #[arg(long, default_value_t = 2400.0)]
    scroll_width: f64,
    /// Visible width of the container in pixels
    #[arg(long, default_value_t = 1200.0)]
    client_width: f64,
    #[arg(long, default_value_t = 8)]
    items: usize,
    /// Simulated time span in milliseconds
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,
    /// Print the position every N milliseconds
    #[arg(long, default_value_t = 500)]
    sample_ms: u64,
    /// Pointer interaction at these offsets (ms)
    #[arg(long = "touch-at", value_delimiter = ',')]
    touch_at: Vec<u64>,
    /// Press "next" at these offsets (ms)
    #[arg(long = "next-at", value_delimiter = ',')]
    next_at: Vec<u64>,
    /// Press "previous" at these offsets (ms)
    #[arg(long = "prev-at", value_delimiter = ',')]
    prev_at: Vec<u64>,
}

/// Run the scheduler against a virtual clock, one millisecond at a time
pub fn run(config: &AppConfig, args: CarouselArgs) -> Result<()> {
    if args.sample_ms == 0 {
        bail!("--sample-ms must be at least 1");
    }

    let carousel = config.carousel.clone();
    let tick = carousel.tick_interval().as_millis().max(1) as u64;
    let frame = carousel.frame_interval().as_millis().max(1) as u64;
    let metrics = CarouselMetrics {
        scroll_width: args.scroll_width,
        client_width: args.client_width,
        item_count: args.items,
    };

    let mut scheduler = AutoAdvanceScheduler::new(carousel, metrics);
    println!(
        "max offset {:.1}px, tick {}ms, frame {}ms",
        metrics.max_offset(),
        tick,
        frame
    );

    let origin = Instant::now();
    for ms in 0..=args.duration_ms {
        let now = origin + Duration::from_millis(ms);

        if args.touch_at.contains(&ms) {
            scheduler.handle(Input::Interaction(now, Interaction::PointerEnter));
            println!("{:>7}ms  touch", ms);
        }
        if args.next_at.contains(&ms) {
            scheduler.handle(Input::Step(now, Direction::Forward));
            println!("{:>7}ms  next", ms);
        }
        if args.prev_at.contains(&ms) {
            scheduler.handle(Input::Step(now, Direction::Backward));
            println!("{:>7}ms  previous", ms);
        }

        let deadline_due = scheduler.next_deadline().is_some_and(|d| d <= now);
        if ms > 0 && (ms % tick == 0 || deadline_due) {
            scheduler.handle(Input::Tick(now));
        }
        if ms > 0 && ms % frame == 0 && scheduler.frames_needed() {
            scheduler.handle(Input::Frame(now));
        }

        if ms % args.sample_ms == 0 {
            let view = scheduler.view();
            println!(
                "{:>7}ms  {:>8.1}px  {:<10} {}{}",
                ms,
                view.position,
                phase_label(&view.phase),
                if view.can_retreat { "<" } else { " " },
                if view.can_advance { ">" } else { " " },
            );
        }

        if scheduler.is_stopped() {
            println!("Carousel stopped: nothing to scroll");
            break;
        }
    }

    Ok(())
}

fn phase_label(phase: &Phase) -> &'static str {
    match phase {
        Phase::Advancing => "advancing",
        Phase::Suspended { .. } => "paused",
        Phase::Holding { .. } => "holding",
        Phase::Rewinding(_) => "rewinding",
        Phase::Stopped => "stopped",
    }
}
