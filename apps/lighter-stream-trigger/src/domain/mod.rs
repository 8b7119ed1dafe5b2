//! Domain Layer - Channel resolution and connection lifecycle types.
//!
//! Pure types with no I/O. Everything here is deterministic and can be
//! tested without a runtime.

/// Channel kinds, subscription configuration and channel resolution.
pub mod channel;

/// Connection state machine, pending reconnects and statistics.
pub mod streaming;
