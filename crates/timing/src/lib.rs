//! Time sources and background timers for the tracking pipeline.
//!
//! Every TTL and interval in the workspace is expressed in epoch milliseconds
//! and read from a [`Clock`], so expiry logic can be driven deterministically
//! in tests with [`ManualClock`].

mod clock;
mod periodic;

pub use clock::{Clock, ClockRef, ManualClock, SystemClock};
pub use periodic::PeriodicTask;
