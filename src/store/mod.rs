//! Persistence layer: bulk load/save of the worker and confirmation sets.

pub mod json;
pub mod memory;
pub mod traits;

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use traits::Store;
