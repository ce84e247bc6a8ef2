//! # Time & Check-in Periods
//!
//! Everything deadline-related: the [`Clock`] seam that lets tests move
//! time forward, the [`CheckInPeriod`] type, and the helpers that turn a
//! period into a deadline and a deadline into "how long is left".
//!
//! All arithmetic is in whole seconds against wall-clock UTC. There is no
//! time-zone handling and no attempt to correct for clock skew.

pub mod clock;
pub mod period;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use period::{
    deadline_from, humanize, is_past, remaining, CheckInPeriod, PeriodUnit, TimeRemaining,
};
