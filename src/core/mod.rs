/*!
 * Core Module
 * Fundamental kernel types and error handling
 */

pub mod errors;
pub mod limits;
pub mod serde;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use errors::{KernelError, SerializableError};
pub use traits::{LifecycleObserver, MessageSink, NullSink};
pub use types::*;
