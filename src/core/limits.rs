/*!
 * System Limits and Constants
 *
 * Centralized location for the subsystem's sizing defaults.
 */

// =============================================================================
// REGISTRY
// =============================================================================

/// Initial bucket count of the object registry
/// [PERF] Sized so typical kernels never rehash under the registry lock
pub const DEFAULT_REGISTRY_CAPACITY: usize = 512;

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Waiting threads listed per variable in a dump
/// Longer lists are truncated; the entry count is always exact
pub const DEFAULT_DUMP_ENTRY_LIMIT: usize = 32;
