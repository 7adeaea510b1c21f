pub mod memory;

pub use memory::InMemoryObjectStore;
