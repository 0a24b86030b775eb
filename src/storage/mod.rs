// storage/mod.rs
// Row model, buffer and flush path

pub mod buffer;
pub mod flush;
pub mod models;

// Re-export commonly used items
pub use buffer::Buffer;
pub use flush::{FlushExecutor, FlushOutcome};
pub use models::{Row, Value};
