//! Configuration and system parameters for the phased multiplication

use crate::constants::{DEFAULT_PER_PROCESS_MEMORY, DEFAULT_RECOVER_NUM, DEFAULT_SELECT_NUM};

/// System parameters for performance tuning
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of worker threads per process used by the local multiply and merge
    pub n_threads: usize,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
        }
    }
}

/// Configuration for the memory-bounded 3D multiplication
#[derive(Debug, Clone)]
pub struct MultiplyConfig {
    /// Requested number of phases; raised if the memory model needs more
    pub phases: usize,

    /// Memory budget of one process in bytes
    pub per_process_memory: usize,

    /// Entries per column kept by the selection step; only enters the memory model
    pub select_num: usize,

    /// Entries per column recovered after pruning; only enters the memory model
    pub recover_num: usize,

    /// System parameters for performance tuning
    pub system_params: SystemParameters,
}

impl Default for MultiplyConfig {
    fn default() -> Self {
        Self {
            phases: 1,
            per_process_memory: DEFAULT_PER_PROCESS_MEMORY,
            select_num: DEFAULT_SELECT_NUM,
            recover_num: DEFAULT_RECOVER_NUM,
            system_params: SystemParameters::default(),
        }
    }
}

impl MultiplyConfig {
    /// Default configuration with a requested phase count
    pub fn with_phases(phases: usize) -> Self {
        Self {
            phases,
            ..Self::default()
        }
    }

    /// Replaces the per-process memory budget
    pub fn memory(mut self, bytes: usize) -> Self {
        self.per_process_memory = bytes;
        self
    }

    /// Replaces the worker thread count
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.system_params.n_threads = n_threads.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = MultiplyConfig::with_phases(3).memory(1024).threads(0);
        assert_eq!(config.phases, 3);
        assert_eq!(config.per_process_memory, 1024);
        assert_eq!(config.system_params.n_threads, 1);
    }
}
