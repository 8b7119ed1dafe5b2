//! Application Layer - Port definitions.
//!
//! The interfaces the connection manager depends on: where decoded
//! messages go and how a feed connection is opened.

/// Port interfaces for the feed transport and the message sink.
pub mod ports;
