//! Collector tuning inputs, fixed at VM start.

/// Default capacity of each semispace (1 MiB).
const DEFAULT_SEMISPACE_CAPACITY: usize = 1024 * 1024;

/// Heap configuration.
///
/// Set once when the VM starts; not mutable mid-run. Both semispaces get
/// the same capacity.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    /// Capacity of each semispace, in bytes.
    pub semispace_capacity: usize,
}

impl HeapConfig {
    /// Creates a configuration with the given per-semispace capacity.
    pub fn with_capacity(semispace_capacity: usize) -> Self {
        HeapConfig { semispace_capacity }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            semispace_capacity: DEFAULT_SEMISPACE_CAPACITY,
        }
    }
}
