//! Transport Layer for Backend-Map Traffic
//!
//! The event channel between the backend and the map is external. When it is
//! a byte stream (the daemon's stdin/stdout pair), this module turns lines
//! into typed frames and back, and answers queries over the same stream.
//!
//! # Design Philosophy
//!
//! Decoding is strict and happens at the edge. A malformed line is reported
//! as a [`WireError`] to the host, which logs and skips it. The controller
//! never sees anything that failed validation.

pub mod frame;
pub mod json_lines;

pub use frame::{decode_inbound, encode, InboundFrame, OutboundFrame, WireError};
pub use json_lines::{JsonLinesBackend, DEFAULT_QUERY_TIMEOUT};
