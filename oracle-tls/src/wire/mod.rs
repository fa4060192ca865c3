//! Bundled TLS engine over TCP.
//!
//! - [`record`]: record framing
//! - [`handshake`]: message encoding and reassembly
//! - [`engine`]: the [`WireEngine`] itself

pub mod engine;
pub mod handshake;
pub mod record;

pub use engine::{WireEngine, WireEngineFactory};
