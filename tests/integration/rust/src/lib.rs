//! Integration test suite for the execution core.
//!
//! Exercises the collector, the native dispatch layer, and the method
//! compiler together across component boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use memory_manager;
    pub use method_compiler;
    pub use native_dispatch;
    pub use object_model;
    pub use runtime;
}
