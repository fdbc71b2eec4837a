/*!
 * Core Module
 * Fundamental kernel types, error handling, and synchronization
 */

pub mod errors;
pub mod limits;
pub mod sync;
pub mod time;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use types::*;
