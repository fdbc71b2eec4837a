/*!
 * Scheduler Module
 * Thread blocking, wakeup, and interruption services
 */

pub mod parking;
pub mod traits;
pub mod types;

// Re-export public API
pub use parking::ParkingScheduler;
pub use traits::ThreadScheduler;
pub use types::{ThreadId, WaitChannel, WakeReason};
