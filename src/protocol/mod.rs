//! Message types passed through the handler pipeline.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`Message`] value type |

// ============================================================================
// Submodules
// ============================================================================

/// Message value type.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::Message;
