//! Background jobs.

mod clock;
mod retention;

#[cfg(test)]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use retention::RetentionJob;
