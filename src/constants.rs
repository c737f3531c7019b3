//! Centralized constants for the phased 3D multiplication
//!
//! These are the factors of the memory model used to estimate how many phases
//! a multiplication needs. All new constants should be added here rather than
//! scattered throughout the code.

// ============================================================================
// MEMORY MODEL
// ============================================================================

/// Copies of the input matrices assumed resident during a multiplication
/// (both operands plus their redistributed forms)
pub const INPUT_MEMORY_FACTOR: i64 = 4;

/// Copies of the intermediate product held at once (partial product plus the
/// chunks received from the fiber)
pub const INTERMEDIATE_MEMORY_FACTOR: i64 = 2;

/// Copies of the output held at once (running result plus the phase result)
pub const OUTPUT_MEMORY_FACTOR: i64 = 2;

/// Bytes per selected entry in the column selection scratch
pub const SELECT_ENTRY_BYTES: i64 = 8;

/// Scratch arrays the column selection keeps per selected entry
pub const SELECT_SCRATCH_ARRAYS: i64 = 3;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default per-process memory budget in bytes (8 GiB)
pub const DEFAULT_PER_PROCESS_MEMORY: usize = 8 * 1024 * 1024 * 1024;

/// Default number of entries kept per column by the selection step
pub const DEFAULT_SELECT_NUM: usize = 1100;

/// Default number of entries recovered per column after pruning
pub const DEFAULT_RECOVER_NUM: usize = 1400;
