//! Credential backends for the two storage tiers.

mod file_backend;
mod memory_backend;

pub use file_backend::FileBackend;
pub use memory_backend::MemoryBackend;
