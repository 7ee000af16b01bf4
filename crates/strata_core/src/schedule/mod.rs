//! # System Scheduling
//!
//! Drives units of work over a frame loop with three phases:
//!
//! ```text
//! every frame:   input(dt) ─► physics(fixed) × N ─► render(dt)
//!                               ▲
//!                 accumulator ──┘ one tick per fixed step of frame time
//! ```
//!
//! Systems are opaque: a name plus a callable taking the elapsed time. They
//! reach the world through whatever they capture, typically an
//! `Arc<parking_lot::Mutex<World>>`.
//!
//! The only cross-thread primitive is [`Signal`], used to stop the loop or
//! pause rendering from elsewhere.

mod scheduler;
mod signal;
mod system;

pub use scheduler::Scheduler;
pub use signal::Signal;
pub use system::{System, SystemLog};
