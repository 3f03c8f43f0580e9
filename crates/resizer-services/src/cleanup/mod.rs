//! Time-based removal of expired artifacts.

mod clock;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use service::{NamespaceSweep, RetentionSweeper, SweepReport};
