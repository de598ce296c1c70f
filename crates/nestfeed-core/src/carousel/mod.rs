//! Carousel auto-advance: a pure state machine plus a tokio driver

mod animation;
mod breakpoints;
mod driver;
mod easing;
mod scheduler;

pub use animation::{lerp, progress, Animation};
pub use breakpoints::{step_unit, tier_for};
pub use driver::{CarouselCommand, CarouselDriver, CarouselHandle};
pub use easing::EasingType;
pub use scheduler::{
    AutoAdvanceScheduler, CarouselMetrics, CarouselView, Direction, Input, Interaction, Output,
    Phase,
};
