pub mod file_store;
pub mod in_memory_store;

// Re-export both blob store types
pub use file_store::FileBlobStore;
pub use in_memory_store::InMemoryBlobStore;
