//! Pure transformations: bitrate arithmetic, progress cadence, URL
//! classification and the clock abstraction.

mod cadence;
mod clock;
pub mod link;
mod throughput;

pub use cadence::{ProgressCadence, percent_of};
pub use clock::{Clock, ManualClock, Stopwatch, SystemClock};
pub use throughput::speed_mbps;
